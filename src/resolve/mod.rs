//! Entity label resolution across data sources.
//!
//! Different datasets spell the same country differently ("USA",
//! "United States of America", "Viet Nam" / "Vietnam"). The resolver maps
//! each raw label to the best-scoring canonical label, and reports labels
//! it could not match instead of hiding them.

mod resolver;
mod similarity;

pub use resolver::{resolve, NameMapping, NameResolver, Resolution, DEFAULT_THRESHOLD};
pub use similarity::{dice_coefficient, initialism, label_similarity, normalize_label};

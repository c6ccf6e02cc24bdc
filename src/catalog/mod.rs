pub mod annotate;
pub mod filter;
pub mod overlap;
pub mod repmask;
pub mod spans;
pub mod trf;

pub use annotate::{AnnotatedInterval, AnnotationJoiner, AnnotationRecord, AnnotationSource};
pub use filter::{FilterParams, FilterStats, RegionFilter};
pub use overlap::{Intersector, OverlapCountRow, OverlapCounter, OverlapMode};
pub use spans::SpanStats;
pub use trf::{TranslatedRecord, TrfReader};

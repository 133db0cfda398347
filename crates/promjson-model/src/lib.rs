mod entry;
pub use entry::{Entry, Histogram, Metric, Summary};

mod error;
pub use error::{ModelError, ModelResult};

mod family;
pub use family::{Family, FamilyType};

mod labels;
pub use labels::Labels;

mod number;
pub use number::{format_count, format_float};

mod builder;
#[allow(clippy::module_inception)]
mod classifier;
mod error;

pub use builder::ClassifierBuilder;
pub use classifier::{ClassificationReport, Classifier, Stage};
pub use error::{ClassificationError, ErrorCause, ErrorKind};

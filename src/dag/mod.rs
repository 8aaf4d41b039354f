mod dag;

pub use dag::{ProcessorReplacer, StreamingDag};

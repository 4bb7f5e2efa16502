pub(crate) mod batch;
pub(crate) mod report;
pub(crate) mod shared;

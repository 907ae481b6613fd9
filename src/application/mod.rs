pub mod deadline;
pub mod decide;
pub mod enrich;
pub mod gather;
pub mod normalize;
pub mod pipeline;
pub mod report;
pub mod scoring;

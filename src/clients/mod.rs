pub mod pipeline_api;
pub mod pipeline_client;

pub use pipeline_api::PipelineApi;
pub use pipeline_client::PipelineClient;

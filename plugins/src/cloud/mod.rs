mod open_cloud;

pub use open_cloud::OpenCloudClient;

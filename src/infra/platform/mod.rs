pub mod http_platform_client;

pub use http_platform_client::HttpPlatformClient;

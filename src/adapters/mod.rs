pub mod http_api;
pub mod rmcp_server;

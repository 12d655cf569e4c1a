pub mod file_utils;
pub mod http_utils;
pub mod path_utils;

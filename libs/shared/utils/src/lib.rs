pub mod time_format;
pub mod test_utils;

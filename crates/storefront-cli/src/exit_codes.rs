//! Process exit codes. Cache failures use `CacheError::exit_code`
//! (2 config, 3 install, 4 digest, 5 network, 6 storage, 7 not installed).

pub const SUCCESS: i32 = 0;
pub const COMMAND_FAILED: i32 = 1; // buy-now answered with a non-200 status
pub const INTERNAL_ERROR: i32 = 2; // setup or config error not classified by the libraries

pub const EXIT_SUCCESS: i32 = 0;
/// Some records failed a judge-backed stage; their ids are in the stage's
/// failure log and a resumed run will retry them.
pub const PARTIAL_FAILURE: i32 = 1;
pub const CONFIG_ERROR: i32 = 2;

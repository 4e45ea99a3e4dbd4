fn main() {
    // Exposes built_info::GIT_COMMIT_HASH and friends to the crate.
    if let Err(err) = built::write_built_file() {
        panic!("failed to acquire build-time information: {err}");
    }
}

pub mod job;
pub mod schedd;

#[allow(unused)]
pub fn enable_test_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

mod test_request_list;

pub mod utils;

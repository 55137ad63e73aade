pub(crate) const DEFAULT_LISTEN: &str = "127.0.0.1:5000";
/// Path every node serves its chain on; peers are fetched from `http://<peer>{FULLCHAIN_PATH}`.
pub(crate) const FULLCHAIN_PATH: &str = "/fullchain";
pub(crate) const NODE_ID_BYTES: usize = 16;

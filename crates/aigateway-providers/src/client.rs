use std::sync::OnceLock;

static SHARED_CLIENT: OnceLock<wreq::Client> = OnceLock::new();

/// One `wreq::Client` shared by every adapter instance and every request.
/// Adapters hold only immutable configuration plus this handle.
pub fn shared_client() -> wreq::Client {
    SHARED_CLIENT
        .get_or_init(|| wreq::Client::builder().build().expect("failed to build shared http client"))
        .clone()
}

pub mod backend;
pub mod noop;
pub mod resend;

pub use backend::{DigestMessage, DigestTransport};
pub use noop::NoopTransport;
pub use resend::ResendTransport;

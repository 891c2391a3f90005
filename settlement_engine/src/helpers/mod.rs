mod webhook_signature;

pub use webhook_signature::{
    calculate_hmac,
    generate_secret,
    verify_hmac,
    EVENT_HEADER,
    SIGNATURE_HEADER,
    TIMESTAMP_HEADER,
};

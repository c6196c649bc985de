//! Safety gate and redaction policy.

use crate::models::{CallbackResult, Disposition};

/// An explicit provider error outranks whatever code/state came along with
/// it. Success needs both `code` and `state`.
pub fn classify(result: &CallbackResult) -> Disposition {
    if present(&result.error) {
        Disposition::ProviderError
    } else if present(&result.code) && present(&result.state) {
        Disposition::Success
    } else {
        Disposition::MalformedCallback
    }
}

fn present(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.is_empty())
}

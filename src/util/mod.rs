pub mod logging;

/// Caps diagnostic detail (raw response bodies, store error text) so log
/// lines and user-facing messages stay bounded.
pub fn truncate_detail(detail: &str, max_chars: usize) -> String {
    if detail.chars().count() <= max_chars {
        detail.to_string()
    } else {
        let cut: String = detail.chars().take(max_chars).collect();
        format!("{}…", cut)
    }
}

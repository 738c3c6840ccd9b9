use super::missing::Code;

/// A resolved value label bound to a coded value of one column.
///
/// `user_missing` is set when the code also falls inside the column's
/// missingness; `tag` additionally names the missing category on targets
/// that distinguish them by letter.
#[derive(Debug, Clone, PartialEq)]
pub struct Category {
    pub code: Code,
    pub label: String,
    pub user_missing: bool,
    pub tag: Option<char>,
}

impl Category {
    #[must_use]
    pub const fn new(code: Code, label: String) -> Self {
        Self {
            code,
            label,
            user_missing: false,
            tag: None,
        }
    }
}

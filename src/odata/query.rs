//! System query options for the mock OData V2 endpoint.
//!
//! SmartTable clients repeat options freely; the first occurrence of each
//! option wins and unknown options are ignored.

/// Raw `$`-options plus the `token` fallback, exactly as they arrived.
#[derive(Debug, Clone, Default)]
pub struct ODataQueryOptions {
    pub filter: Option<String>,
    pub orderby: Option<String>,
    pub select: Option<String>,
    pub skip: Option<String>,
    pub top: Option<String>,
    pub token: Option<String>,
}

impl ODataQueryOptions {
    /// Parses a percent-encoded query string, keeping the first value seen
    /// for each recognized option.
    pub fn from_query(raw_query: &str) -> Self {
        let mut options = Self::default();
        for (key, value) in url::form_urlencoded::parse(raw_query.as_bytes()) {
            let slot = match key.as_ref() {
                "$filter" => &mut options.filter,
                "$orderby" => &mut options.orderby,
                "$select" => &mut options.select,
                "$skip" => &mut options.skip,
                "$top" => &mut options.top,
                "token" => &mut options.token,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value.into_owned());
            }
        }
        options
    }

    /// Row offset. Missing, unparsable, or negative values mean no offset.
    pub fn skip_value(&self) -> usize {
        self.skip
            .as_deref()
            .and_then(|raw| raw.trim().parse::<i64>().ok())
            .map(|skip| skip.max(0) as usize)
            .unwrap_or(0)
    }

    /// Row limit. Missing, unparsable, or non-positive values disable paging.
    pub fn top_value(&self) -> Option<usize> {
        self.top
            .as_deref()
            .and_then(|raw| raw.trim().parse::<i64>().ok())
            .filter(|top| *top > 0)
            .map(|top| top as usize)
    }
}

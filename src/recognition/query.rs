use serde::Serialize;

use super::{extract_area, has_text, is_generic_name, VenueCandidate};

/// Map search endpoint; the encoded query is appended verbatim.
pub const MAPS_SEARCH_BASE: &str = "https://www.google.com/maps/search/?api=1&query=";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchQuery {
    pub parts: Vec<String>,
    pub text: String,
    pub url: String,
}

/// Builds the map search for one valid candidate.
///
/// Parts are appended in a fixed priority: name, social handle, area token
/// (or the raw address when no area is recognised), and finally the first
/// food keyword when the name alone is too generic.
pub fn build_query(candidate: &VenueCandidate, food_keywords: &str) -> SearchQuery {
    let mut parts = vec![candidate.name.trim().to_string()];

    if let Some(handle) = candidate
        .original_handle
        .as_deref()
        .filter(|h| !h.trim().is_empty())
    {
        parts.push(handle.to_string());
    }

    let area = extract_area(&candidate.address);
    if !area.is_empty() {
        parts.push(area);
    } else if has_text(&candidate.address) {
        parts.push(candidate.address.trim().to_string());
    }

    if is_generic_name(&candidate.name) {
        if let Some(keyword) = food_keywords.split_whitespace().next() {
            parts.push(keyword.to_string());
        }
    }

    let text = parts.join(" ");
    let url = format!("{}{}", MAPS_SEARCH_BASE, urlencoding::encode(&text));

    SearchQuery { parts, text, url }
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    fn query_param(url: &str) -> String {
        let parsed = Url::parse(url).expect("absolute url");
        parsed
            .query_pairs()
            .find(|(k, _)| k == "query")
            .map(|(_, v)| v.into_owned())
            .expect("query param")
    }

    #[test]
    fn name_then_raw_address_when_no_area() {
        let q = build_query(&VenueCandidate::new("喝碗雞湯", "後站 健行路"), "");
        assert_eq!(q.parts, vec!["喝碗雞湯", "後站 健行路"]);
        assert_eq!(q.text, "喝碗雞湯 後站 健行路");
        assert!(q.url.starts_with(MAPS_SEARCH_BASE));
        assert!(!q.url.contains(' '));
        assert_eq!(query_param(&q.url), "喝碗雞湯 後站 健行路");
    }

    #[test]
    fn area_token_replaces_full_address() {
        let q = build_query(&VenueCandidate::new("Mountain", "桃園後站 健行路"), "");
        assert_eq!(q.parts, vec!["Mountain", "桃園"]);
    }

    #[test]
    fn handle_follows_name_before_location() {
        let candidate = VenueCandidate::new("Mountain", "桃園後站 健行路").with_handle("no5ca_fe");
        let q = build_query(&candidate, "");
        assert_eq!(q.parts, vec!["Mountain", "no5ca_fe", "桃園"]);
    }

    #[test]
    fn handle_is_appended_as_given() {
        let candidate = VenueCandidate::new("Mountain", "unknown").with_handle("@No5.Ca_Fe ");
        let q = build_query(&candidate, "");
        assert_eq!(q.parts, vec!["Mountain", "@No5.Ca_Fe "]);
    }

    #[test]
    fn blank_handle_and_unknown_address_add_nothing() {
        let candidate = VenueCandidate::new("Mountain", "unknown").with_handle(" ");
        let q = build_query(&candidate, "拉麵");
        assert_eq!(q.parts, vec!["Mountain"]);
    }

    #[test]
    fn keyword_only_for_generic_names() {
        let generic = build_query(&VenueCandidate::new("街角咖啡廳", "中壢"), "早午餐 咖啡 甜點");
        assert_eq!(generic.parts, vec!["街角咖啡廳", "中壢", "早午餐"]);

        let short = build_query(&VenueCandidate::new("日和", "unknown"), "  丼飯  ");
        assert_eq!(short.parts, vec!["日和", "丼飯"]);

        let distinctive = build_query(&VenueCandidate::new("Mountain", ""), "早午餐 咖啡");
        assert_eq!(distinctive.parts, vec!["Mountain"]);
        assert!(!distinctive.text.contains("早午餐"));
    }

    #[test]
    fn generic_name_without_keywords_stays_short() {
        let q = build_query(&VenueCandidate::new("麵店", ""), "   ");
        assert_eq!(q.parts, vec!["麵店"]);
    }

    #[test]
    fn reserved_characters_are_encoded() {
        let q = build_query(&VenueCandidate::new("A&B Café #2", "unknown"), "");
        let encoded = q.url.trim_start_matches(MAPS_SEARCH_BASE);
        assert!(!encoded.contains('&'));
        assert!(!encoded.contains('#'));
        assert_eq!(query_param(&q.url), "A&B Café #2");
    }
}

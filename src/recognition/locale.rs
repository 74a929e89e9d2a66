use super::is_unknown;

/// Ordered administrative-area tokens. Districts come before cities so the
/// most specific anchor wins; road-name-prone district names carry their
/// `區` suffix.
pub const GAZETTEER: &[&str] = &[
    // Taipei
    "信義區", "大安區", "中山區", "中正區", "松山區", "萬華區", "大同區", "文山區", "南港區",
    "內湖", "士林", "北投",
    // New Taipei
    "板橋", "三重", "中和", "永和", "新莊", "新店", "土城", "蘆洲", "樹林", "汐止", "鶯歌",
    "三峽", "淡水", "林口", "五股", "泰山",
    // Taoyuan
    "中壢", "平鎮", "八德", "楊梅", "龍潭", "大園", "龜山", "蘆竹",
    // Taichung
    "西屯", "北屯", "南屯", "逢甲", "豐原", "大里",
    // Hsinchu, Tainan, Kaohsiung
    "竹北", "安平", "永康", "左營", "鳳山", "三民區", "苓雅", "前鎮", "鼓山",
    // Cities and counties
    "台北", "臺北", "新北", "桃園", "台中", "臺中", "台南", "臺南", "高雄", "基隆", "新竹",
    "苗栗", "彰化", "南投", "雲林", "嘉義", "屏東", "宜蘭", "花蓮", "台東", "臺東", "澎湖",
    "金門", "馬祖",
];

/// Category nouns that make a venue name too common to search on alone.
/// ASCII entries are matched case-insensitively.
pub const GENERIC_NAME_NOUNS: &[&str] = &[
    "麵包店", "烘焙坊", "咖啡廳", "咖啡館", "咖啡店", "麵店", "麵館", "拉麵店", "飲料店", "手搖",
    "早餐店", "小吃", "餐廳", "餐館", "便當", "甜點店", "冰店", "火鍋店", "燒烤店", "牛肉麵",
    "滷味", "雞排", "豆花", "cafe", "café", "coffee", "bakery", "restaurant", "bistro",
];

pub const MIN_DISTINCTIVE_NAME_CHARS: usize = 3;

/// First gazetteer token contained in `address`, or an empty string.
pub fn extract_area(address: &str) -> String {
    if address.trim().is_empty() || is_unknown(address) {
        return String::new();
    }

    GAZETTEER
        .iter()
        .find(|area| address.contains(*area))
        .map(|area| area.to_string())
        .unwrap_or_default()
}

pub fn is_generic_name(name: &str) -> bool {
    let trimmed = name.trim();
    if trimmed.chars().count() < MIN_DISTINCTIVE_NAME_CHARS {
        return true;
    }

    let lowered = trimmed.to_lowercase();
    GENERIC_NAME_NOUNS
        .iter()
        .any(|noun| lowered.contains(noun))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_token_is_returned() {
        assert_eq!(extract_area("中壢"), "中壢");
        assert_eq!(extract_area("新北市樹林區樹林四街"), "樹林");
        assert_eq!(extract_area("高雄市左營區博愛二路"), "左營");
    }

    #[test]
    fn gazetteer_order_beats_text_order() {
        // "台北" appears first in the text but districts are listed first.
        assert_eq!(extract_area("台北市信義區松仁路"), "信義區");
        assert_eq!(extract_area("桃園後站 健行路"), "桃園");
    }

    #[test]
    fn no_match_sentinel_and_empty_give_empty() {
        assert_eq!(extract_area("後站 健行路"), "");
        assert_eq!(extract_area("unknown"), "");
        assert_eq!(extract_area(""), "");
        assert_eq!(extract_area("   "), "");
    }

    #[test]
    fn district_road_names_do_not_match() {
        assert_eq!(extract_area("中山路二段"), "");
    }

    #[test]
    fn every_gazetteer_entry_extracts_itself() {
        for area in GAZETTEER {
            let found = extract_area(area);
            assert!(!found.is_empty(), "{} not extracted", area);
            assert!(area.contains(found.as_str()));
        }
    }

    #[test]
    fn short_names_are_generic() {
        assert!(is_generic_name("日和"));
        assert!(is_generic_name("A"));
        assert!(is_generic_name(""));
        assert!(!is_generic_name("喝碗雞湯"));
    }

    #[test]
    fn category_nouns_are_generic() {
        assert!(is_generic_name("咖啡廳"));
        assert!(is_generic_name("街角咖啡廳"));
        assert!(is_generic_name("阿明麵店"));
        assert!(is_generic_name("Sunny Bakery"));
    }

    #[test]
    fn distinctive_names_are_not_generic() {
        assert!(!is_generic_name("Mountain"));
        assert!(!is_generic_name("秋甜甜"));
    }
}

//! Session query-parameter selection and merging.

use std::collections::{BTreeMap, HashSet};

use url::Url;

/// Which of the session's parameters ride along on an outgoing request.
#[derive(Debug, Clone, Default)]
pub enum SessionParams {
    /// No session parameters are attached.
    #[default]
    Omit,
    /// Every session parameter not already present on the URL.
    All,
    /// Only the named keys, and only where the URL does not set them itself.
    Only(Vec<String>),
}

/// Merge session parameters into `url` under `policy`.
///
/// Keys the URL already carries always win; the session's value is dropped.
pub(crate) fn attach_session_params(
    url: &mut Url,
    params: &BTreeMap<String, String>,
    policy: &SessionParams,
) {
    if matches!(policy, SessionParams::Omit) {
        return;
    }
    let taken: HashSet<String> = url.query_pairs().map(|(key, _)| key.into_owned()).collect();
    let additions: Vec<(&String, &String)> = params
        .iter()
        .filter(|(key, _)| !taken.contains(*key))
        .filter(|(key, _)| match policy {
            SessionParams::Omit => false,
            SessionParams::All => true,
            SessionParams::Only(keys) => keys.iter().any(|k| k == *key),
        })
        .collect();
    if additions.is_empty() {
        return;
    }
    let mut query = url.query_pairs_mut();
    for (key, value) in additions {
        query.append_pair(key, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session_params(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    fn query_pairs(url: &Url) -> Vec<(String, String)> {
        url.query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect()
    }

    #[test]
    fn url_value_wins_on_collision() {
        let mut url = Url::parse("https://example.com/page?a=1").unwrap();
        let params = session_params(&[("a", "2"), ("b", "3")]);
        attach_session_params(&mut url, &params, &SessionParams::All);
        assert_eq!(
            query_pairs(&url),
            vec![("a".into(), "1".into()), ("b".into(), "3".into())]
        );
    }

    #[test]
    fn omit_leaves_the_url_untouched() {
        let mut url = Url::parse("https://example.com/page?a=1").unwrap();
        let params = session_params(&[("b", "3")]);
        attach_session_params(&mut url, &params, &SessionParams::Omit);
        assert_eq!(url.as_str(), "https://example.com/page?a=1");
    }

    #[test]
    fn only_injects_the_named_subset() {
        let mut url = Url::parse("https://example.com/page?b=9").unwrap();
        let params = session_params(&[("a", "1"), ("b", "3"), ("c", "4")]);
        attach_session_params(
            &mut url,
            &params,
            &SessionParams::Only(vec!["b".into(), "c".into()]),
        );
        assert_eq!(
            query_pairs(&url),
            vec![("b".into(), "9".into()), ("c".into(), "4".into())]
        );
    }

    #[test]
    fn attaches_to_a_bare_url() {
        let mut url = Url::parse("https://example.com/page").unwrap();
        let params = session_params(&[("sessionid", "abc")]);
        attach_session_params(&mut url, &params, &SessionParams::All);
        assert_eq!(url.query(), Some("sessionid=abc"));
    }
}

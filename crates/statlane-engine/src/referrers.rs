//! Canonical referrer roots.
//!
//! Maps a human-readable referrer name ("Google", "Hacker News") to the
//! set of domains and app-scheme prefixes that traffic from that source
//! arrives under. Used by the `refn` filter column.

/// One match pattern for a referrer root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RefPattern {
    /// App or deep-link scheme, matched as a prefix of the raw referrer.
    SchemePrefix(&'static str),
    /// Bare domain, matched as equality or a `.domain` suffix so
    /// subdomains count toward the same root.
    Domain(&'static str),
}

const REFERRER_ROOTS: &[(&str, &[&str])] = &[
    (
        "Google",
        &[
            "google.com",
            "www.google.com",
            "android-app://com.google.android.googlequicksearchbox",
        ],
    ),
    ("Bing", &["bing.com", "www.bing.com", "cn.bing.com"]),
    ("DuckDuckGo", &["duckduckgo.com"]),
    ("Yahoo", &["yahoo.com", "search.yahoo.com"]),
    ("Baidu", &["baidu.com", "www.baidu.com"]),
    ("Yandex", &["yandex.ru", "yandex.com"]),
    ("Ecosia", &["ecosia.org", "www.ecosia.org"]),
    (
        "Facebook",
        &["facebook.com", "m.facebook.com", "l.facebook.com", "lm.facebook.com"],
    ),
    ("Instagram", &["instagram.com", "l.instagram.com"]),
    ("X", &["x.com", "twitter.com", "t.co"]),
    ("LinkedIn", &["linkedin.com", "lnkd.in"]),
    (
        "Reddit",
        &["reddit.com", "old.reddit.com", "out.reddit.com"],
    ),
    ("YouTube", &["youtube.com", "m.youtube.com", "youtu.be"]),
    ("TikTok", &["tiktok.com", "www.tiktok.com"]),
    ("Pinterest", &["pinterest.com", "www.pinterest.com"]),
    ("GitHub", &["github.com", "gist.github.com"]),
    ("GitLab", &["gitlab.com"]),
    ("Stack Overflow", &["stackoverflow.com"]),
    (
        "Hacker News",
        &[
            "news.ycombinator.com",
            "android-app://com.stefandekanski.hackernews.free",
        ],
    ),
    (
        "Telegram",
        &["t.me", "telegram.me", "web.telegram.org", "tg://resolve"],
    ),
    ("WhatsApp", &["whatsapp.com", "l.wl.co", "wa.me"]),
    ("Slack", &["slack.com", "app.slack.com"]),
    ("Discord", &["discord.com", "discordapp.com"]),
    ("Medium", &["medium.com", "link.medium.com"]),
    ("Substack", &["substack.com", "open.substack.com"]),
    ("Product Hunt", &["producthunt.com", "www.producthunt.com"]),
    ("Wikipedia", &["wikipedia.org", "en.wikipedia.org"]),
];

/// Resolve a referrer name to its match patterns.
///
/// Unknown names resolve to no patterns; the compiler then matches the
/// literal itself as a domain, so filters created against older versions
/// of this table keep matching after entries are renamed.
pub(crate) fn patterns_for(name: &str) -> Vec<RefPattern> {
    for (root, patterns) in REFERRER_ROOTS {
        if root.eq_ignore_ascii_case(name) {
            return patterns.iter().map(|p| classify(p)).collect();
        }
    }
    Vec::new()
}

pub(crate) fn classify(pattern: &'static str) -> RefPattern {
    if pattern.contains("://") {
        RefPattern::SchemePrefix(pattern)
    } else {
        RefPattern::Domain(pattern)
    }
}

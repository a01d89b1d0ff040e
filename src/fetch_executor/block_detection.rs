//! Access-control challenge detection
//!
//! Classification is driven by an ordered rule table. Adding a provider means
//! adding a row to [`BLOCK_RULES`]; control flow never changes. A detected
//! block is terminal: the page is reported as blocked and nothing is done to
//! get past the challenge.

use serde::Serialize;

use crate::utils::visible_text;

/// Which kind of anti-automation mechanism intercepted the request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum ChallengeSignal {
    /// Interstitial "checking your browser" style challenge
    Cloudflare,
    /// Firewall / access-denied response
    Waf,
    /// Human-verification widget
    Captcha,
    #[default]
    None,
}

/// What a rule inspects
#[derive(Debug, Clone, Copy)]
pub enum Matcher {
    /// Case-insensitive phrase in the visible page text
    TextPhrase(&'static str),
    /// Case-insensitive token anywhere in the raw markup (script names, widget classes)
    MarkupToken(&'static str),
    /// Exact response status
    Status(u16),
    /// Response status combined with a visible phrase
    StatusWithPhrase(u16, &'static str),
}

#[derive(Debug, Clone, Copy)]
pub struct BlockRule {
    pub name: &'static str,
    pub signal: ChallengeSignal,
    pub matcher: Matcher,
}

const fn rule(name: &'static str, signal: ChallengeSignal, matcher: Matcher) -> BlockRule {
    BlockRule {
        name,
        signal,
        matcher,
    }
}

/// Rules in priority order; the first match decides the reported signal
pub const BLOCK_RULES: &[BlockRule] = &[
    rule("checking-your-browser", ChallengeSignal::Cloudflare, Matcher::TextPhrase("checking your browser")),
    rule("just-a-moment", ChallengeSignal::Cloudflare, Matcher::TextPhrase("just a moment...")),
    rule("ddos-protection", ChallengeSignal::Cloudflare, Matcher::TextPhrase("ddos protection by")),
    rule("cf-browser-verification", ChallengeSignal::Cloudflare, Matcher::MarkupToken("cf-browser-verification")),
    rule("cf-chl-opt", ChallengeSignal::Cloudflare, Matcher::MarkupToken("cf_chl_opt")),
    rule("challenge-platform", ChallengeSignal::Cloudflare, Matcher::MarkupToken("challenge-platform")),
    rule("rate-limited-challenge", ChallengeSignal::Cloudflare, Matcher::StatusWithPhrase(429, "checking")),
    rule("verify-you-are-human", ChallengeSignal::Captcha, Matcher::TextPhrase("verify you are human")),
    rule("are-you-a-robot", ChallengeSignal::Captcha, Matcher::TextPhrase("are you a robot")),
    rule("captcha-text", ChallengeSignal::Captcha, Matcher::TextPhrase("captcha")),
    rule("recaptcha-widget", ChallengeSignal::Captcha, Matcher::MarkupToken("g-recaptcha")),
    rule("hcaptcha-widget", ChallengeSignal::Captcha, Matcher::MarkupToken("h-captcha")),
    rule("hcaptcha-script", ChallengeSignal::Captcha, Matcher::MarkupToken("hcaptcha.com")),
    rule("turnstile-widget", ChallengeSignal::Captcha, Matcher::MarkupToken("cf-turnstile")),
    rule("access-denied", ChallengeSignal::Waf, Matcher::TextPhrase("access denied")),
    rule("no-permission", ChallengeSignal::Waf, Matcher::TextPhrase("you don't have permission to access")),
    rule("request-blocked", ChallengeSignal::Waf, Matcher::TextPhrase("request blocked")),
    rule("waf-phrase", ChallengeSignal::Waf, Matcher::TextPhrase("web application firewall")),
    rule("status-403", ChallengeSignal::Waf, Matcher::Status(403)),
];

/// Evidence that a request was intercepted rather than served
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct SecurityBlockSignal {
    pub challenge_detected: bool,
    pub access_denied: bool,
    pub human_verification: bool,
    pub status_code: Option<u16>,
    pub signal: ChallengeSignal,
    /// Name of the first rule that matched
    pub matched_rule: Option<String>,
}

impl SecurityBlockSignal {
    pub fn is_blocked(&self) -> bool {
        self.challenge_detected || self.access_denied || self.human_verification
    }
}

/// Run every rule against a rendered page
pub fn detect(html: &str, status: Option<u16>) -> SecurityBlockSignal {
    detect_with(BLOCK_RULES, html, status)
}

/// Run a custom rule table against a rendered page
pub fn detect_with(rules: &[BlockRule], html: &str, status: Option<u16>) -> SecurityBlockSignal {
    let text = visible_text(html);
    let markup = html.to_lowercase();
    let mut result = SecurityBlockSignal {
        status_code: status,
        ..SecurityBlockSignal::default()
    };

    for rule in rules {
        let hit = match rule.matcher {
            Matcher::TextPhrase(phrase) => text.contains(phrase),
            Matcher::MarkupToken(token) => markup.contains(token),
            Matcher::Status(code) => status == Some(code),
            Matcher::StatusWithPhrase(code, phrase) => status == Some(code) && text.contains(phrase),
        };
        if !hit {
            continue;
        }

        match rule.signal {
            ChallengeSignal::Cloudflare => result.challenge_detected = true,
            ChallengeSignal::Waf => result.access_denied = true,
            ChallengeSignal::Captcha => result.human_verification = true,
            ChallengeSignal::None => {}
        }
        if result.matched_rule.is_none() && rule.signal != ChallengeSignal::None {
            result.signal = rule.signal;
            result.matched_rule = Some(rule.name.to_string());
        }
    }

    result
}

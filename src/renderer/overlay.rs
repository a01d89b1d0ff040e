//! Best-effort dismissal of blocking overlays before document export
//!
//! Three phases, each only if the previous one did not clear the page:
//! 1. inject CSS hiding known dialog, overlay and consent selectors
//! 2. click the first visible control from a prioritized dismiss/accept list
//! 3. remove fixed/absolute high-z-index dialogs and consent containers
//!
//! Native `alert`/`confirm`/`prompt` dialogs are accepted automatically for
//! the page's lifetime via [`auto_dismiss_dialogs`].

use chromiumoxide::Page;
use chromiumoxide::cdp::browser_protocol::page::{
    EventJavascriptDialogOpening, HandleJavaScriptDialogParams,
};
use futures::StreamExt;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

/// Selectors hidden by the CSS phase
pub const HIDE_SELECTORS: &[&str] = &[
    "#onetrust-consent-sdk",
    "#onetrust-banner-sdk",
    "#CybotCookiebotDialog",
    "#cookie-law-info-bar",
    "#cookie-notice",
    "#cookieConsent",
    ".cc-window",
    ".cookie-banner",
    ".cookie-consent",
    ".qc-cmp2-container",
    ".fc-consent-root",
    "#truste-consent-track",
    ".modal-backdrop",
    "[aria-modal='true']",
];

/// Dismiss controls, most specific first
pub const DISMISS_SELECTORS: &[&str] = &[
    "#onetrust-accept-btn-handler",
    "#CybotCookiebotDialogBodyButtonAccept",
    "#CybotCookiebotDialogBodyLevelButtonLevelOptinAllowAll",
    ".cc-dismiss",
    ".cc-allow",
    "#cookie_action_close_header",
    "#truste-consent-button",
    ".fc-cta-consent",
    "button[aria-label='Accept cookies']",
    "button[aria-label='Close']",
    "button[aria-label='close']",
    "[data-dismiss='modal']",
    ".modal .close",
    ".modal-close",
    ".popup-close",
    "#accept-cookies",
    ".accept-cookies",
    "button.cookie-accept",
];

/// Containers removed by the last-resort phase
pub const REMOVE_SELECTORS: &[&str] = &[
    "#onetrust-consent-sdk",
    "#CybotCookiebotDialog",
    "#cookie-law-info-bar",
    ".cc-window",
    ".qc-cmp2-container",
    ".fc-consent-root",
    "#truste-consent-track",
    ".modal-backdrop",
];

/// Button labels accepted by the click phase when no selector matched
const DISMISS_LABELS: &[&str] = &[
    "accept",
    "accept all",
    "accept all cookies",
    "accept cookies",
    "i accept",
    "agree",
    "i agree",
    "allow all",
    "got it",
    "ok",
    "close",
    "dismiss",
    "no thanks",
];

/// Elements whose label may be matched; links only when clicking cannot navigate
const LABEL_CANDIDATES: &str =
    r##"button, [role="button"], a:not([href]), a[href="#"], a[href^="javascript:"]"##;

fn js_string_array(items: &[&str]) -> String {
    serde_json::to_string(items).unwrap_or_else(|_| "[]".to_string())
}

/// CSS-hide phase; returns how many matching elements were present
pub fn hide_script() -> String {
    format!(
        r#"(() => {{
    const selectors = {selectors};
    const style = document.createElement('style');
    style.setAttribute('data-pagefetch', 'overlay-hide');
    style.textContent = selectors.join(',\n') +
        ' {{ display: none !important; visibility: hidden !important; }}\n' +
        'html, body {{ overflow: auto !important; }}';
    (document.head || document.documentElement).appendChild(style);
    let matched = 0;
    for (const sel of selectors) {{
        try {{ matched += document.querySelectorAll(sel).length; }} catch (_) {{}}
    }}
    return matched;
}})()"#,
        selectors = js_string_array(HIDE_SELECTORS)
    )
}

/// Click phase; returns the selector or label that was clicked, or null
pub fn click_script() -> String {
    format!(
        r#"(() => {{
    const selectors = {selectors};
    const labels = {labels};
    const visible = (el) => {{
        const rect = el.getBoundingClientRect();
        const style = window.getComputedStyle(el);
        return rect.width > 0 && rect.height > 0 &&
            style.visibility !== 'hidden' && style.display !== 'none';
    }};
    for (const sel of selectors) {{
        let nodes = [];
        try {{ nodes = document.querySelectorAll(sel); }} catch (_) {{ continue; }}
        for (const el of nodes) {{
            if (visible(el)) {{ el.click(); return sel; }}
        }}
    }}
    for (const el of document.querySelectorAll({candidates})) {{
        const text = (el.innerText || '').trim().toLowerCase();
        if (labels.includes(text) && visible(el)) {{ el.click(); return 'label:' + text; }}
    }}
    return null;
}})()"#,
        selectors = js_string_array(DISMISS_SELECTORS),
        labels = js_string_array(DISMISS_LABELS),
        candidates = serde_json::to_string(LABEL_CANDIDATES).unwrap_or_else(|_| "'button'".to_string())
    )
}

/// Removal phase; returns how many nodes were removed
pub fn remove_script() -> String {
    format!(
        r#"(() => {{
    const containers = {containers};
    let removed = 0;
    for (const sel of containers) {{
        try {{
            document.querySelectorAll(sel).forEach((el) => {{ el.remove(); removed++; }});
        }} catch (_) {{}}
    }}
    const pattern = /(modal|overlay|popup|consent|cookie|banner|dialog|gdpr)/i;
    for (const el of Array.from(document.querySelectorAll('body *'))) {{
        const style = window.getComputedStyle(el);
        if (style.position !== 'fixed' && style.position !== 'absolute') continue;
        const z = parseInt(style.zIndex, 10);
        if (isNaN(z) || z < 1000) continue;
        const tag = (el.id || '') + ' ' + (typeof el.className === 'string' ? el.className : '');
        if (el.getAttribute('role') === 'dialog' || el.getAttribute('aria-modal') === 'true' || pattern.test(tag)) {{
            el.remove();
            removed++;
        }}
    }}
    document.documentElement.style.overflow = 'auto';
    if (document.body) document.body.style.overflow = 'auto';
    return removed;
}})()"#,
        containers = js_string_array(REMOVE_SELECTORS)
    )
}

/// Run the three dismissal phases; returns whether any overlay was dismissed
pub async fn dismiss_overlays(page: &Page) -> bool {
    let hidden = eval_or_default::<u64>(page, &hide_script()).await;
    if hidden > 0 {
        debug!("Overlay CSS phase hid {} elements", hidden);
    }

    let clicked = eval_or_default::<Option<String>>(page, &click_script()).await;
    if let Some(ref target) = clicked {
        debug!("Overlay click phase clicked {}", target);
        tokio::time::sleep(Duration::from_millis(300)).await;
    }

    let removed = if clicked.is_none() {
        let removed = eval_or_default::<u64>(page, &remove_script()).await;
        if removed > 0 {
            debug!("Overlay removal phase removed {} nodes", removed);
        }
        removed
    } else {
        0
    };

    hidden > 0 || clicked.is_some() || removed > 0
}

async fn eval_or_default<T>(page: &Page, script: &str) -> T
where
    T: serde::de::DeserializeOwned + Default,
{
    match page.evaluate(script).await {
        Ok(result) => result.into_value::<T>().unwrap_or_default(),
        Err(e) => {
            trace!("Overlay script failed: {}", e);
            T::default()
        }
    }
}

/// Accept every native dialog the page opens until the returned task is aborted
pub async fn auto_dismiss_dialogs(page: &Page) -> Option<JoinHandle<()>> {
    let mut events = match page.event_listener::<EventJavascriptDialogOpening>().await {
        Ok(events) => events,
        Err(e) => {
            debug!("Could not subscribe to dialog events: {}", e);
            return None;
        }
    };
    let page = page.clone();
    Some(tokio::spawn(async move {
        while let Some(event) = events.next().await {
            debug!("Auto-dismissing {:?} dialog: {}", event.r#type, event.message);
            if let Err(e) = page.execute(HandleJavaScriptDialogParams::new(true)).await {
                trace!("Failed to dismiss dialog: {}", e);
            }
        }
    }))
}

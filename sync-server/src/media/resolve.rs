//! Canonical URL resolution
//!
//! Internal scheme locators become fetchable URLs under the tenant's source
//! domain asset path; URLs already in canonical form pass through unchanged.

use super::INTERNAL_SCHEME;
use crate::db::models::Tenant;

/// Resolve a raw media reference to its canonical fetch URL
pub fn resolve_reference(raw: &str, tenant: &Tenant) -> String {
    if let Some(locator) = raw.strip_prefix(INTERNAL_SCHEME) {
        // internal://{kind}/{path} -> https://{domain}/cdn/{kind}/{path}
        return format!("https://{}/cdn/{}", tenant.source_domain, locator);
    }

    if raw.starts_with("http://") || raw.starts_with("https://") {
        return raw.to_string();
    }

    // Bare file names land under the generic files path
    format!(
        "https://{}/cdn/files/{}",
        tenant.source_domain,
        raw.trim_start_matches('/')
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tenant() -> Tenant {
        Tenant::new("acme", "store.example", "token")
    }

    #[test]
    fn internal_scheme_resolves_under_source_domain() {
        assert_eq!(
            resolve_reference("internal://shop_images/logo.png", &tenant()),
            "https://store.example/cdn/shop_images/logo.png"
        );
        assert_eq!(
            resolve_reference("internal://shop_videos/intro.mp4", &tenant()),
            "https://store.example/cdn/shop_videos/intro.mp4"
        );
    }

    #[test]
    fn canonical_urls_pass_through() {
        let url = "https://elsewhere.example/cdn/a.jpg";
        assert_eq!(resolve_reference(url, &tenant()), url);
    }

    #[test]
    fn bare_names_land_under_files() {
        assert_eq!(
            resolve_reference("banner.webp", &tenant()),
            "https://store.example/cdn/files/banner.webp"
        );
    }
}

use super::*;

#[test]
fn extract_host_strips_scheme_and_path() {
    assert_eq!(
        extract_host("http://www.bonobos.com/b/mens-pants.json"),
        "www.bonobos.com"
    );
}

#[test]
fn extract_host_keeps_subdomains() {
    assert_eq!(
        extract_host("https://api.shop.example.com/b/x.json"),
        "api.shop.example.com"
    );
}

#[test]
fn extract_host_falls_back_to_input() {
    assert_eq!(extract_host("not a url"), "not a url");
}

#[test]
fn http_fetcher_builds_with_retries_disabled() {
    assert!(HttpFetcher::new(5, "salewatch-test/0.1", 0, 0).is_ok());
}

use std::collections::HashMap;
use std::time::Duration;

use revcrawl::{
    CrawlOptions, Crawler, FetchClient, HttpTransport, IdentityPool, RecordSink, RetryPolicy, Site,
    Target, crawl_target,
};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn listing_item(login: &str, place: &str, date: &str, rate: u8, href: &str) -> String {
    format!(
        r#"<div class="item">
             <a class="user-login">{login}</a>
             <div class="user-info"><div>{place}</div></div>
             <span class="review-postdate">{date}</span>
             <div class="product-rating tooltip-right" title="Рейтинг: {rate}"></div>
             <a class="review-btn review-read-link" href="{href}">read</a>
           </div>"#
    )
}

fn detail_page(plus: &str, minus: &str) -> String {
    format!(
        r#"<html><body>
             <div class="summary">Summary</div>
             <div class="review-plus">{plus}</div>
             <div class="review-minus">{minus}</div>
             <div class="review-body description">Body text</div>
           </body></html>"#
    )
}

async fn serve(server: &MockServer, route: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn otzovik_listing_chain_lands_in_versioned_csv() {
    let server = MockServer::start().await;
    let page_1 = format!(
        "<html><body>{}{}<a class=\"pager-item next tooltip-top\" href=\"/reviews/svc/2/\">next</a></body></html>",
        listing_item("alice", "Россия, Москва", "05.03.2021", 5, "/review_1.html"),
        listing_item("bob", "Казахстан", "17.11.2020", 2, "/review_2.html"),
    );
    let page_2 = format!(
        "<html><body>{}</body></html>",
        listing_item("carol", "Россия, Казань", "01.01.2022", 4, "/review_3.html"),
    );
    serve(&server, "/reviews/svc/", page_1).await;
    serve(&server, "/reviews/svc/2/", page_2).await;
    serve(&server, "/review_1.html", detail_page("fast", "pricey")).await;
    serve(&server, "/review_2.html", detail_page("cheap", "laggy")).await;
    serve(&server, "/review_3.html", detail_page("catalog", "")).await;

    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("otzovik")).unwrap();
    std::fs::write(dir.path().join("otzovik/svc_1.csv"), "earlier run\n").unwrap();

    let sink = RecordSink::new(dir.path().join("otzovik"), Site::Otzovik.fields());
    let target = Target {
        url: format!("{}/reviews/svc/", server.uri()),
        name: "svc".to_string(),
        site: Site::Otzovik,
    };
    let pool = IdentityPool::with_seed(Vec::new(), vec!["ua-1".into(), "ua-2".into()], 5);
    let fetch = FetchClient::new(
        HttpTransport::new(Duration::from_secs(5)),
        pool,
        RetryPolicy::immediate(Some(3)),
    );
    let mut crawler = Crawler::new(fetch, CrawlOptions::default());

    let summary = crawl_target(&mut crawler, &sink, &target).await.unwrap();

    assert_eq!(summary.pages, 2);
    assert_eq!(summary.records, 3);

    let output = dir.path().join("otzovik/svc_2.csv");
    let mut reader = csv::Reader::from_path(&output).unwrap();
    let headers = reader.headers().unwrap().clone();
    assert_eq!(headers.iter().collect::<Vec<_>>(), Site::Otzovik.fields());

    let rows = reader
        .records()
        .map(|record| {
            let record = record.unwrap();
            headers
                .iter()
                .zip(record.iter())
                .map(|(h, v)| (h.to_string(), v.to_string()))
                .collect::<HashMap<_, _>>()
        })
        .collect::<Vec<_>>();

    assert_eq!(rows.len(), 3);
    let logins = rows.iter().map(|r| r["login"].as_str()).collect::<Vec<_>>();
    assert_eq!(logins, ["alice", "bob", "carol"]);
    assert_eq!(rows[0]["plus"], "fast");
    assert_eq!(rows[0]["date"], "05-03-2021");
    assert_eq!(rows[0]["city"], "Москва");
    assert_eq!(rows[1]["rate"], "2");
    assert_eq!(rows[1]["minus"], "laggy");
    assert_eq!(rows[1]["city"], "");
    assert_eq!(rows[2]["country"], "Россия");
    assert!(rows.iter().all(|r| r["source"] == "otzovik"));
    assert!(rows.iter().all(|r| !r["collected_at"].is_empty()));

    let untouched = std::fs::read_to_string(dir.path().join("otzovik/svc_1.csv")).unwrap();
    assert_eq!(untouched, "earlier run\n");
}

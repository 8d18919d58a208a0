//! Performance benchmarks for legal-link detection and modal discovery.
//!
//! Run with: `cargo bench`
//!
//! Benchmarks include:
//! - Page-wide legal-link scan over a storefront with many links
//! - The full locator cascade, hit early and exhausted
//! - Readable-text extraction from a long policy page

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use scraper::Selector;
use termsdigest::detection::LinkScanner;
use termsdigest::dom::Page;
use termsdigest::extraction::{ContentExtractor, ModalLocator};
use url::Url;

const LEGAL: &str = "These terms of service govern your use of the store. \
    Orders renew automatically each month until cancelled. \
    Refunds are issued within fourteen days of a written request.";

fn storefront(products: usize) -> String {
    let mut html = String::from("<html><body><header><a href=\"/\">Home</a></header><main>");
    for i in 0..products {
        html.push_str(&format!(
            "<div class=\"card\"><h3>Product {i}</h3><p>Soft cotton tee, free returns.</p>\
             <button onclick=\"add({i})\">Add to cart</button><a href=\"/p/{i}\">Details</a></div>"
        ));
    }
    html.push_str("</main><footer>");
    html.push_str("<a id=\"tos\" href=\"javascript:void(0)\">Terms of Service</a>");
    html.push_str("<a href=\"/privacy\">Privacy Policy</a><a href=\"/refunds\">Refund policy</a>");
    html.push_str("</footer>");
    html
}

fn with_modal(products: usize) -> String {
    format!(
        "{}<div class=\"modal\" style=\"display:none\"><section class=\"terms-of-service\">{}</section></div></body></html>",
        storefront(products),
        LEGAL.repeat(20)
    )
}

fn page(html: &str) -> Page {
    Page::parse(Url::parse("https://shop.example.com/").unwrap(), html)
}

fn bench_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("scan");
    for products in [10, 100, 500] {
        let p = page(&format!("{}</body></html>", storefront(products)));
        group.throughput(Throughput::Elements(products as u64));
        group.bench_with_input(BenchmarkId::from_parameter(products), &p, |b, p| {
            b.iter(|| LinkScanner::new().scan(black_box(p)));
        });
    }
    group.finish();
}

fn bench_locate(c: &mut Criterion) {
    let locator = ModalLocator::new();
    let trigger = Selector::parse("#tos").unwrap();

    let mut group = c.benchmark_group("locate");
    for products in [10, 100, 500] {
        let hit = page(&with_modal(products));
        group.bench_with_input(BenchmarkId::new("hit", products), &hit, |b, p| {
            let el = p.select_first(&trigger).unwrap();
            b.iter(|| locator.locate(black_box(p), el));
        });

        let miss = page(&format!("{}</body></html>", storefront(products)));
        group.bench_with_input(BenchmarkId::new("exhausted", products), &miss, |b, p| {
            let el = p.select_first(&trigger).unwrap();
            b.iter(|| locator.locate(black_box(p), el));
        });
    }
    group.finish();
}

fn bench_extract(c: &mut Criterion) {
    let html = format!(
        "<html><body><nav>Home</nav><main><h1>Terms</h1>{}</main><footer>Copyright</footer></body></html>",
        format!("<p>{}</p>\n", LEGAL).repeat(200)
    );
    c.bench_function("extract_from_html", |b| {
        b.iter(|| ContentExtractor::extract_from_html(black_box(&html)));
    });
}

criterion_group!(benches, bench_scan, bench_locate, bench_extract);
criterion_main!(benches);

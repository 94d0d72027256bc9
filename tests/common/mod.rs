//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::Duration;

use route_dispatch::config::parse_config;
use route_dispatch::routing::Dispatcher;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

/// Storefront with a gated shop area, a tenant wildcard and an admin area.
pub const SHOP_CONFIG: &str = r#"
debug = true

[title]
site_name = "Storefront"

[rendering]
default_renderer = "view"

[url_alias]
index = "/"
error404 = "/not-found"
login = "/login"

[routes]
cache = { status = true }
"@main" = { title = "Home" }

[routes."/not-found"]
"@main" = {}

[routes."/login"]
"@main" = { parameters = ["?tenant"] }

[routes."/shop"]
auth_tag = "customer"
"@main" = {}
"@checkout" = { parameters = ["orderId"], title = "Checkout" }

[routes."/items"]
renderer = "json"
"@show" = { parameters = ["id", "?name"] }

[routes."/?tenant"]
auth_tag = "?tenant"
auth_fail_url = "/login/?tenant"
"@main" = {}
"@report" = { parameters = ["?year"] }

[routes."/admin"]
auth_tag = "admin"
cache = { status = false }
"@main" = {}
"@maintenance" = { offline = true }
"#;

pub fn dispatcher(src: &str) -> Dispatcher {
    parse_config(src).expect("fixture config is valid")
}

pub fn shop() -> Dispatcher {
    dispatcher(SHOP_CONFIG)
}

/// Send a raw HTTP/1.1 GET and return the whole response text.
pub async fn raw_get(addr: SocketAddr, path: &str, cookie: Option<&str>) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let cookie = cookie
        .map(|c| format!("Cookie: {}\r\n", c))
        .unwrap_or_default();
    let request = format!(
        "GET {} HTTP/1.1\r\nHost: {}\r\n{}Connection: close\r\n\r\n",
        path, addr, cookie
    );
    stream.write_all(request.as_bytes()).await.unwrap();

    let mut response = String::new();
    tokio::time::timeout(Duration::from_secs(5), stream.read_to_string(&mut response))
        .await
        .expect("server answered in time")
        .unwrap();
    response
}

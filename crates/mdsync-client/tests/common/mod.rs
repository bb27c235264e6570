#![allow(dead_code)]

use std::future::Future;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use mdsync_client::page::HeadlessPage;
use mdsync_core::{LinkHandle, PagePort, ScrollBehavior, ScrollTarget};

pub const TASK_LIST: &str = r#"<ul><li><p><input type="checkbox"> ship it</p></li></ul>"#;

/// A page the test can inspect while the session loop owns a handle to it.
#[derive(Clone, Default)]
pub struct SharedPage(Arc<Mutex<HeadlessPage>>);

impl SharedPage {
    pub fn new(page: HeadlessPage) -> Self {
        Self(Arc::new(Mutex::new(page)))
    }

    pub fn read<T>(&self, f: impl FnOnce(&HeadlessPage) -> T) -> T {
        f(&self.0.lock().expect("page lock"))
    }

    fn write<T>(&self, f: impl FnOnce(&mut HeadlessPage) -> T) -> T {
        f(&mut self.0.lock().expect("page lock"))
    }
}

impl PagePort for SharedPage {
    fn replace_body(&mut self, html: &str) {
        self.write(|page| page.replace_body(html))
    }

    fn highlight_code(&mut self, selector: &str) {
        self.write(|page| page.highlight_code(selector))
    }

    fn find_stylesheet(&self, id: &str) -> Option<LinkHandle> {
        self.read(|page| page.find_stylesheet(id))
    }

    fn stylesheet_href(&self, link: LinkHandle) -> Option<String> {
        self.read(|page| page.stylesheet_href(link))
    }

    fn append_stylesheet(&mut self, href: &str) -> LinkHandle {
        self.write(|page| page.append_stylesheet(href))
    }

    fn remove_stylesheet(&mut self, link: LinkHandle) {
        self.write(|page| page.remove_stylesheet(link))
    }

    fn tag_stylesheet(&mut self, link: LinkHandle, id: &str) {
        self.write(|page| page.tag_stylesheet(link, id))
    }

    fn scroll_by(&mut self, delta: i64, behavior: ScrollBehavior) {
        self.write(|page| page.scroll_by(delta, behavior))
    }

    fn scroll_to(&mut self, target: ScrollTarget, behavior: ScrollBehavior) {
        self.write(|page| page.scroll_to(target, behavior))
    }

    fn outer_html(&self) -> String {
        self.read(|page| page.outer_html())
    }
}

/// Shared log of what a fixture server received.
#[derive(Clone, Default)]
pub struct Recorder(Arc<Mutex<Vec<String>>>);

impl Recorder {
    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().expect("recorder lock").push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().expect("recorder lock").clone()
    }
}

pub async fn serve(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind fixture");
    let addr = listener.local_addr().expect("fixture addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

/// Poll `check` until it holds or five seconds pass.
pub async fn wait_until(mut check: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while tokio::time::Instant::now() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    check()
}

pub async fn join<T>(handle: impl Future<Output = Result<T, tokio::task::JoinError>>) -> T {
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("session loop finished")
        .expect("session task")
}

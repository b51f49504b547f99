//! Render one page to stdout

use anyhow::Result;

use crate::helpers::request_path;
use crate::Blog;

/// Print the page a GET request for `path` would return
pub async fn run(blog: &Blog, path: &str) -> Result<()> {
    let generator = blog.generator()?;
    let page = generator.render_path(&request_path(path)).await;

    if !page.status.is_success() {
        tracing::warn!("Page {:?} rendered with status {}", path, page.status);
    }
    println!("{}", page.html);
    Ok(())
}

//! List the posts in catalog order

use anyhow::Result;

use crate::content::Catalog;
use crate::Blog;

/// Print every post, newest first
pub async fn run(blog: &Blog) -> Result<()> {
    let generator = blog.generator()?;
    let catalog = generator.catalog().await?;
    print!("{}", format_catalog(&catalog));
    Ok(())
}

fn format_catalog(catalog: &Catalog) -> String {
    let mut out = format!("Posts ({}):\n", catalog.len());
    for post in catalog.posts() {
        out.push_str(&format!(
            "  {:<10} - {} [{}]\n",
            post.metadata.creation_date().unwrap_or("-"),
            post.title(),
            post.identifier
        ));
        let extra: Vec<&str> = post.metadata.unrecognized_keys().collect();
        if !extra.is_empty() {
            tracing::debug!("{} has unrecognized metadata keys: {:?}", post.identifier, extra);
        }
    }
    out
}

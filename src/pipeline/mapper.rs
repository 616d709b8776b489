// src/pipeline/mapper.rs
// Pure mapping from a fetched article to the CMS record shape.

use crate::gnews::SourceArticle;
use crate::strapi::{AssetReference, ContentRecord, RecordStatus};

/// Build the record for one article.
///
/// With image processing on, the record references the uploaded asset (when
/// the upload produced one) and never carries the original URL. With it off,
/// the original URL is passed through untouched. `category` is the batch's
/// raw search query.
pub fn map_record(
    article: &SourceArticle,
    asset: Option<AssetReference>,
    process_images: bool,
    category: &str,
) -> ContentRecord {
    let (image_url, image) = if process_images {
        (None, asset.map(|a| a.id))
    } else {
        (article.image.clone(), None)
    };

    ContentRecord {
        title: article.title.clone(),
        description: article.description.clone(),
        content: article.content.clone(),
        source_url: article.url.clone(),
        image_url,
        image,
        published_at: article.published_at,
        source_name: article.source_name.clone(),
        source_website: article.source_url.clone(),
        category: category.to_string(),
        status: RecordStatus::Published,
    }
}

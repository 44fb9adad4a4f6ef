//! Helpers shared by the mediakb binaries.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use mediakb_core::config::{expand_path, Backend, Settings};
use mediakb_core::memory::InMemoryKnowledgeBase;
use mediakb_core::schema::Catalog;
use mediakb_core::traits::KnowledgeBase;
use mediakb_core::types::{AttributeFilter, RangeRole};
use mediakb_search::{ElasticsearchKnowledgeBase, EsClient};

/// Logs go to stderr; `RUST_LOG` overrides `default_filter`.
pub fn init_tracing(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

pub fn open_knowledge_base(settings: &Settings) -> anyhow::Result<Arc<dyn KnowledgeBase>> {
    match settings.knowledge_base.backend {
        Backend::Elasticsearch => {
            let client = EsClient::new(&settings.elasticsearch)?;
            info!(url = client.base_url(), "using elasticsearch knowledge base");
            Ok(Arc::new(ElasticsearchKnowledgeBase::new(client, Catalog::default())))
        }
        Backend::Memory => {
            let dir = settings
                .knowledge_base
                .memory_dir
                .as_deref()
                .map(expand_path)
                .context("knowledge_base.memory_dir is not set")?;
            info!(dir = %dir.display(), "using in-memory knowledge base");
            Ok(Arc::new(InMemoryKnowledgeBase::from_dir(Catalog::default(), &dir)?))
        }
    }
}

/// Parses `name=value`, `name>value`, `name>=value`, `name<value` or
/// `name<=value` into a filter.
pub fn parse_filter(arg: &str) -> Option<AttributeFilter> {
    let ops = [(">=", RangeRole::Gte), ("<=", RangeRole::Lte), (">", RangeRole::Gt), ("<", RangeRole::Lt), ("=", RangeRole::Eq)];
    let (pos, op, role) = ops
        .iter()
        .filter_map(|(op, role)| arg.find(op).map(|p| (p, *op, *role)))
        .min_by_key(|(p, op, _)| (*p, std::cmp::Reverse(op.len())))?;
    let name = arg[..pos].trim();
    let value = arg[pos + op.len()..].trim();
    if name.is_empty() || value.is_empty() {
        return None;
    }
    let filter = AttributeFilter::new(name, value);
    Some(if role == RangeRole::Eq { filter } else { filter.with_role(role) })
}

pub fn current_dir() -> PathBuf {
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filters_from_arguments() {
        assert_eq!(parse_filter("author=Scott Fitzgerald"), Some(AttributeFilter::new("author", "Scott Fitzgerald")));
        assert_eq!(
            parse_filter("publication_year>=2000"),
            Some(AttributeFilter::new("publication_year", "2000").with_role(RangeRole::Gte))
        );
        assert_eq!(
            parse_filter("publication_year<1950"),
            Some(AttributeFilter::new("publication_year", "1950").with_role(RangeRole::Lt))
        );
        assert_eq!(parse_filter("title=a=b"), Some(AttributeFilter::new("title", "a=b")));
        assert_eq!(parse_filter("author"), None);
        assert_eq!(parse_filter("=x"), None);
    }
}

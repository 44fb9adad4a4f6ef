use std::fs;
use tempfile::TempDir;

use mediakb_core::dataset::{read_ndjson, write_ndjson, DatasetProcessor, DatasetSpec};
use mediakb_core::memory::InMemoryKnowledgeBase;
use mediakb_core::schema::Catalog;
use mediakb_core::traits::KnowledgeBase;
use mediakb_core::types::AttributeFilter;
use serde_json::json;

fn spec(name: &str) -> DatasetSpec {
    DatasetSpec::defaults().into_iter().find(|s| s.name == name).unwrap()
}

const MOVIES: &str = "\
imdb_title_id,title,original_title,year,genre,director,actors,description,avg_vote
tt0113277,Heat,Heat,1995,\"Crime, Drama\",Michael Mann,\"Al Pacino, Robert De Niro\",A group of high-end professional thieves.,8.2
tt0000009,Miss Jerry,Miss Jerry,1894,Romance,Alexander Black,Blanche Bayliss,,5.9
,No Id,No Id,2001,Drama,Nobody,Nobody,Missing id.,1.0
";

#[test]
fn movie_columns_map_one_to_one_onto_documents() {
    let processor = DatasetProcessor::new(".");
    let out = processor.process_reader(&spec("movies"), MOVIES.as_bytes()).expect("process");

    assert_eq!(out.index, "movie");
    assert_eq!(out.report.rows_read, 3);
    assert_eq!(out.report.documents, 2);
    assert_eq!(out.report.skipped, 1, "row without id is skipped");

    let heat = &out.documents[0];
    assert_eq!(heat.id, "tt0113277");
    assert_eq!(heat.source.get("title"), Some(&json!("Heat")));
    assert_eq!(heat.source.get("publication_year"), Some(&json!(1995)));
    assert_eq!(heat.source.get("genres"), Some(&json!("Crime, Drama")));
    assert_eq!(heat.source.get("actors"), Some(&json!("Al Pacino, Robert De Niro")));
    assert_eq!(heat.source.get("director"), Some(&json!("Michael Mann")));
    assert_eq!(heat.source.get("summary"), Some(&json!("A group of high-end professional thieves.")));
    assert!(heat.source.get("avg_vote").is_none(), "unmapped columns stay out");

    let jerry = &out.documents[1];
    assert!(jerry.source.get("summary").is_none(), "empty cells are omitted");
}

#[test]
fn book_summaries_are_read_without_headers() {
    let tmp = TempDir::new().unwrap();
    let raw = tmp.path().join("data/raw");
    fs::create_dir_all(&raw).unwrap();
    fs::write(
        raw.join("booksummaries.txt"),
        "843\t/m/0k36\tThe Great Gatsby\tScott Fitzgerald\t1925-04-10\t{\"/m/02xlf\": \"Fiction\", \"/m/0dwly\": \"Novel\"}\tNick moves to West Egg.\n\
         986\t/m/0ldx\tDune\tFrank Herbert\t1965\t{}\tPaul \"Muad'Dib\" Atreides.\n",
    )
    .unwrap();

    let out = DatasetProcessor::new(tmp.path()).process(&spec("books")).expect("process");
    assert_eq!(out.documents.len(), 2);
    let gatsby = &out.documents[0];
    assert_eq!(gatsby.id, "843");
    assert_eq!(gatsby.source.get("author"), Some(&json!("Scott Fitzgerald")));
    assert_eq!(gatsby.source.get("publication_year"), Some(&json!(1925)));
    assert_eq!(gatsby.source.get("genres"), Some(&json!("Fiction, Novel")));
    let dune = &out.documents[1];
    assert!(dune.source.get("genres").is_none());
    assert_eq!(dune.source.get("summary"), Some(&json!("Paul \"Muad'Dib\" Atreides.")));
}

#[test]
fn missing_dataset_file_is_reported() {
    let tmp = TempDir::new().unwrap();
    let err = DatasetProcessor::new(tmp.path()).process(&spec("ratings")).unwrap_err();
    assert!(err.to_string().contains("IMDb ratings.csv"));
}

#[test]
fn unknown_column_is_a_config_error() {
    let mut broken = spec("ratings");
    broken.id_column = "tconst".into();
    let err = DatasetProcessor::new(".")
        .process_reader(&broken, "imdb_title_id,mean_vote,total_votes\n".as_bytes())
        .unwrap_err();
    assert!(err.to_string().contains("tconst"));
}

#[tokio::test]
async fn bulk_files_feed_the_in_memory_knowledge_base() {
    let tmp = TempDir::new().unwrap();
    let processor = DatasetProcessor::new(".");
    let movies = processor.process_reader(&spec("movies"), MOVIES.as_bytes()).unwrap();
    let ratings = processor
        .process_reader(&spec("ratings"), "imdb_title_id,mean_vote,total_votes\ntt0113277,8.1,\"1,234\"\n".as_bytes())
        .unwrap();
    write_ndjson(&tmp.path().join("movie.ndjson"), &movies.documents).unwrap();
    write_ndjson(&tmp.path().join("rating.ndjson"), &ratings.documents).unwrap();
    fs::write(tmp.path().join("notes.ndjson"), "").unwrap();

    assert_eq!(read_ndjson(&tmp.path().join("movie.ndjson")).unwrap(), movies.documents);

    let kb = InMemoryKnowledgeBase::from_dir(Catalog::default(), tmp.path()).expect("load");
    assert_eq!(kb.count("movie"), 2);
    let hits = kb
        .get_objects("movie", &[AttributeFilter::new("director", "Michael Mann")], 5)
        .await
        .unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].name, "Heat from 1995");

    let rating = kb.get_object("rating", "tt0113277").await.unwrap().expect("rating shares movie id");
    assert_eq!(rating.name, "8.1 out of 10 (1234 votes)");
}

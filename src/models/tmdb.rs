use serde::{Deserialize, Serialize};

// ============================================================================
// The Movie Database (TMDB) API Types
// ============================================================================

/// Paged response from `/search/movie` and `/discover/movie`
#[derive(Debug, Clone, Deserialize)]
pub struct TmdbPagedResponse {
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub results: Vec<TmdbMovieSummary>,
    #[serde(default)]
    pub total_pages: u32,
}

/// A search or discover result
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TmdbMovieSummary {
    pub id: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub original_title: Option<String>,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub popularity: Option<f64>,
    #[serde(default)]
    pub vote_average: Option<f64>,
    #[serde(default)]
    pub genre_ids: Vec<u64>,
}

/// Response from `/movie/{id}?append_to_response=credits,videos`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct TmdbMovieDetails {
    pub id: u64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub original_title: Option<String>,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub runtime: Option<i32>,
    #[serde(default)]
    pub production_countries: Vec<TmdbCountry>,
    #[serde(default)]
    pub original_language: Option<String>,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub budget: Option<i64>,
    #[serde(default)]
    pub revenue: Option<i64>,
    #[serde(default)]
    pub genres: Vec<TmdbGenre>,
    #[serde(default)]
    pub credits: Option<TmdbCredits>,
    #[serde(default)]
    pub videos: Option<TmdbVideos>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TmdbCountry {
    #[serde(default)]
    pub iso_3166_1: Option<String>,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TmdbGenre {
    pub id: u64,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct TmdbCredits {
    #[serde(default)]
    pub cast: Vec<TmdbCastMember>,
    #[serde(default)]
    pub crew: Vec<TmdbCrewMember>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TmdbCastMember {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TmdbCrewMember {
    pub name: String,
    #[serde(default)]
    pub job: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct TmdbVideos {
    #[serde(default)]
    pub results: Vec<TmdbVideo>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TmdbVideo {
    pub key: String,
    #[serde(default)]
    pub site: String,
    #[serde(rename = "type", default)]
    pub video_type: String,
    #[serde(default)]
    pub iso_639_1: Option<String>,
}

/// TMDB genre id of "Adventure"
pub const TMDB_ADVENTURE_GENRE_ID: u64 = 12;

/// Local genre names for TMDB genre ids, used when TMDB omits a name
pub fn local_genre_name(tmdb_genre_id: u64) -> Option<&'static str> {
    match tmdb_genre_id {
        28 => Some("Acción"),
        12 => Some("Aventura"),
        35 => Some("Comedia"),
        18 => Some("Drama"),
        27 => Some("Terror"),
        878 => Some("Ciencia Ficción"),
        14 => Some("Fantasía"),
        10749 => Some("Romance"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_response_deserialization() {
        let json = r#"{
            "page": 1,
            "results": [{
                "id": 85,
                "title": "En busca del arca perdida",
                "original_title": "Raiders of the Lost Ark",
                "overview": "Indiana Jones...",
                "release_date": "1981-06-12",
                "poster_path": "/ceG9VzoRAVGwivFU403Wc3AHRys.jpg",
                "popularity": 41.2,
                "vote_average": 7.9,
                "genre_ids": [12, 28]
            }],
            "total_pages": 1,
            "total_results": 1
        }"#;

        let response: TmdbPagedResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.results.len(), 1);
        assert_eq!(response.results[0].id, 85);
        assert_eq!(response.results[0].genre_ids, vec![12, 28]);
    }

    #[test]
    fn test_details_deserialization_with_missing_fields() {
        let json = r#"{
            "id": 85,
            "title": "En busca del arca perdida",
            "release_date": "",
            "credits": { "cast": [{"name": "Harrison Ford", "character": "Indy"}], "crew": [] },
            "videos": { "results": [{"key": "abc", "site": "YouTube", "type": "Trailer"}] }
        }"#;

        let details: TmdbMovieDetails = serde_json::from_str(json).unwrap();
        assert_eq!(details.runtime, None);
        assert!(details.genres.is_empty());
        assert_eq!(details.credits.unwrap().cast[0].name, "Harrison Ford");
        assert_eq!(details.videos.unwrap().results[0].video_type, "Trailer");
    }

    #[test]
    fn test_local_genre_name() {
        assert_eq!(local_genre_name(TMDB_ADVENTURE_GENRE_ID), Some("Aventura"));
        assert_eq!(local_genre_name(99), None);
    }
}

use sqlx::{Postgres, QueryBuilder};

use super::{
    constraint_error, like_pattern,
    rows::{GenreRow, MovieRow, PersonRow, SummaryRow, MOVIE_SELECT, SUMMARY_SELECT},
    PgStore,
};
use crate::{
    db::CatalogStore,
    error::{AppError, AppResult},
    models::{
        DbId, Genre, Movie, MovieFilter, MovieOrder, MovieSummary, NewMovie, NewPerson, Person,
        PersonRole,
    },
};

fn people_table(role: PersonRole) -> &'static str {
    match role {
        PersonRole::Director => "directors",
        PersonRole::Actor => "actors",
    }
}

/// ORDER BY matching `MovieOrder::compare`; expects `m` and the rating aggregate `r`
fn order_clause(order: MovieOrder) -> &'static str {
    match order {
        MovieOrder::Az => " ORDER BY m.title ASC, m.id ASC",
        MovieOrder::Za => " ORDER BY m.title DESC, m.id ASC",
        MovieOrder::Recent => " ORDER BY m.year DESC, m.added_at DESC, m.id ASC",
        MovieOrder::Oldest => " ORDER BY m.year ASC, m.added_at ASC, m.id ASC",
        MovieOrder::Best => " ORDER BY r.average_rating DESC NULLS LAST, m.year DESC, m.id ASC",
        MovieOrder::Worst => " ORDER BY r.average_rating ASC NULLS LAST, m.year ASC, m.id ASC",
        MovieOrder::Newest => " ORDER BY m.added_at DESC, m.id DESC",
        MovieOrder::Chronological => " ORDER BY m.year DESC, m.title ASC, m.id ASC",
    }
}

fn push_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &MovieFilter) {
    builder.push(" WHERE TRUE");

    if let Some(genre_id) = filter.genre_id {
        builder
            .push(" AND EXISTS (SELECT 1 FROM movie_genres fg WHERE fg.movie_id = m.id AND fg.genre_id = ")
            .push_bind(genre_id)
            .push(")");
    }

    if let Some(text) = filter.text.as_deref() {
        let pattern = like_pattern(text);
        builder
            .push(" AND (m.title ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR m.original_title ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR m.synopsis ILIKE ")
            .push_bind(pattern.clone());

        if filter.match_credits {
            builder
                .push(
                    " OR EXISTS (SELECT 1 FROM movie_genres cg JOIN genres g ON g.id = cg.genre_id \
                     WHERE cg.movie_id = m.id AND g.name ILIKE ",
                )
                .push_bind(pattern.clone())
                .push(")")
                .push(" OR EXISTS (SELECT 1 FROM directors d WHERE d.id = m.director_id AND d.name ILIKE ")
                .push_bind(pattern)
                .push(")");
        }

        builder.push(")");
    }
}

#[async_trait::async_trait]
impl CatalogStore for PgStore {
    async fn list_genres(&self) -> AppResult<Vec<Genre>> {
        let rows: Vec<GenreRow> =
            sqlx::query_as("SELECT id, name, description FROM genres ORDER BY name, id")
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().map(Genre::from).collect())
    }

    async fn find_genre(&self, id: DbId) -> AppResult<Option<Genre>> {
        let row: Option<GenreRow> =
            sqlx::query_as("SELECT id, name, description FROM genres WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(Genre::from))
    }

    async fn find_genre_by_name(&self, name: &str) -> AppResult<Option<Genre>> {
        let row: Option<GenreRow> = sqlx::query_as(
            "SELECT id, name, description FROM genres WHERE LOWER(name) = LOWER($1) ORDER BY id LIMIT 1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Genre::from))
    }

    async fn create_genre(&self, name: &str, description: &str) -> AppResult<Genre> {
        let row: GenreRow = sqlx::query_as(
            "INSERT INTO genres (name, description) VALUES ($1, $2) RETURNING id, name, description",
        )
        .bind(name)
        .bind(description)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| constraint_error(e, "Genre"))?;
        Ok(row.into())
    }

    async fn get_or_create_genre(&self, name: &str) -> AppResult<Genre> {
        // DO UPDATE so RETURNING also yields the existing row
        let row: GenreRow = sqlx::query_as(
            r#"
            INSERT INTO genres (name) VALUES ($1)
            ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
            RETURNING id, name, description
            "#,
        )
        .bind(name)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    async fn find_genres(&self, ids: &[DbId]) -> AppResult<Vec<Genre>> {
        let rows: Vec<GenreRow> = sqlx::query_as(
            "SELECT id, name, description FROM genres WHERE id = ANY($1) ORDER BY name",
        )
        .bind(ids.to_vec())
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Genre::from).collect())
    }

    async fn create_person(&self, role: PersonRole, person: NewPerson) -> AppResult<Person> {
        let row: PersonRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO {} (name, biography, birth_date, nationality)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, biography, birth_date, nationality
            "#,
            people_table(role)
        ))
        .bind(&person.name)
        .bind(&person.biography)
        .bind(person.birth_date)
        .bind(&person.nationality)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    async fn get_or_create_person(
        &self,
        role: PersonRole,
        name: &str,
        nationality: &str,
    ) -> AppResult<Person> {
        let table = people_table(role);
        let existing: Option<PersonRow> = sqlx::query_as(&format!(
            "SELECT id, name, biography, birth_date, nationality FROM {} WHERE name = $1 ORDER BY id LIMIT 1",
            table
        ))
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = existing {
            return Ok(row.into());
        }

        tracing::debug!(role = role.label(), name, "Creating person");
        self.create_person(
            role,
            NewPerson {
                name: name.to_string(),
                biography: String::new(),
                birth_date: None,
                nationality: nationality.to_string(),
            },
        )
        .await
    }

    async fn find_people(&self, role: PersonRole, ids: &[DbId]) -> AppResult<Vec<Person>> {
        let rows: Vec<PersonRow> = sqlx::query_as(&format!(
            r#"
            SELECT p.id, p.name, p.biography, p.birth_date, p.nationality
            FROM UNNEST($1::bigint[]) WITH ORDINALITY AS wanted(id, position)
            JOIN {} p ON p.id = wanted.id
            ORDER BY wanted.position
            "#,
            people_table(role)
        ))
        .bind(ids.to_vec())
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Person::from).collect())
    }

    async fn create_movie(&self, movie: NewMovie) -> AppResult<Movie> {
        let mut tx = self.pool.begin().await?;

        let movie_id: DbId = sqlx::query_scalar(
            r#"
            INSERT INTO movies (title, original_title, synopsis, year, duration_minutes,
                                director_id, country, language, poster_url, trailer_url,
                                release_date, budget, revenue, classification)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            RETURNING id
            "#,
        )
        .bind(&movie.title)
        .bind(&movie.original_title)
        .bind(&movie.synopsis)
        .bind(movie.year)
        .bind(movie.duration_minutes)
        .bind(movie.director_id)
        .bind(&movie.country)
        .bind(&movie.language)
        .bind(&movie.poster_url)
        .bind(&movie.trailer_url)
        .bind(movie.release_date)
        .bind(movie.budget)
        .bind(movie.revenue)
        .bind(movie.classification.as_str())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| constraint_error(e, "Movie director"))?;

        sqlx::query(
            r#"
            INSERT INTO movie_genres (movie_id, genre_id)
            SELECT $1, g FROM UNNEST($2::bigint[]) AS g
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(movie_id)
        .bind(&movie.genre_ids)
        .execute(&mut *tx)
        .await
        .map_err(|e| constraint_error(e, "Movie genre"))?;

        sqlx::query(
            r#"
            INSERT INTO movie_actors (movie_id, actor_id, position)
            SELECT $1, a.id, a.position
            FROM UNNEST($2::bigint[]) WITH ORDINALITY AS a(id, position)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(movie_id)
        .bind(&movie.actor_ids)
        .execute(&mut *tx)
        .await
        .map_err(|e| constraint_error(e, "Movie cast"))?;

        tx.commit().await?;

        tracing::info!(movie_id, title = %movie.title, "Movie created");
        self.find_movie(movie_id)
            .await?
            .ok_or_else(|| AppError::Internal("Created movie vanished".to_string()))
    }

    async fn find_movie(&self, id: DbId) -> AppResult<Option<Movie>> {
        let row: Option<MovieRow> = sqlx::query_as(&format!("{MOVIE_SELECT} WHERE m.id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Movie::try_from).transpose()
    }

    async fn movie_exists(&self, title: &str, year: i32) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM movies WHERE title = $1 AND year = $2)",
        )
        .bind(title)
        .bind(year)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn count_movies(&self, filter: &MovieFilter) -> AppResult<u64> {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM movies m");
        push_filter(&mut builder, filter);
        let count: i64 = builder.build_query_scalar().fetch_one(&self.pool).await?;
        Ok(count as u64)
    }

    async fn list_movies(
        &self,
        filter: &MovieFilter,
        order: MovieOrder,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<MovieSummary>> {
        let mut builder = QueryBuilder::<Postgres>::new(SUMMARY_SELECT);
        push_filter(&mut builder, filter);
        builder
            .push(order_clause(order))
            .push(" LIMIT ")
            .push_bind(limit as i64)
            .push(" OFFSET ")
            .push_bind(offset as i64);

        let rows: Vec<SummaryRow> = builder.build_query_as().fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(MovieSummary::from).collect())
    }

    async fn rating_stats(&self, movie_id: DbId) -> AppResult<(Option<f64>, i64)> {
        let stats: (Option<f64>, i64) = sqlx::query_as(
            "SELECT AVG(score)::float8, COUNT(*) FROM ratings WHERE movie_id = $1",
        )
        .bind(movie_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_clause_puts_unrated_last() {
        assert!(order_clause(MovieOrder::Best).contains("NULLS LAST"));
        assert!(order_clause(MovieOrder::Worst).contains("NULLS LAST"));
    }

    #[test]
    fn test_filter_sql() {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM movies m");
        push_filter(
            &mut builder,
            &MovieFilter {
                genre_id: Some(3),
                text: Some("jones".to_string()),
                match_credits: true,
            },
        );
        let sql = builder.sql();
        assert!(sql.contains("fg.genre_id = $1"));
        assert!(sql.contains("m.title ILIKE $2"));
        assert!(sql.contains("d.name ILIKE $6"));
    }
}

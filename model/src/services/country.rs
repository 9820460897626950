use crate::{db::Connection, error::Result, schema::Country};

#[derive(Clone, Debug)]
pub struct CountryService {
    conn: Connection,
}

impl CountryService {
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    pub async fn get_country(&self, country_id: i16) -> Result<Country> {
        self.conn.get(&country_id).await.map_err(|err| {
            tracing::warn!(country_id, "country does not exist");
            err
        })
    }
}

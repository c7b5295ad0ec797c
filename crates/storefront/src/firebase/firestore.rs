//! Firestore v1 REST implementation of [`DocumentStore`].

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tracing::instrument;

use emporium_core::backend::{BackendError, Document, DocumentStore, Precondition, Revision};

use super::value::{decode, decode_fields, encode, encode_fields};
use super::{FIRESTORE_HOST, FirebaseBackend, FirebaseError, auto_id};

/// Page size for collection listing. The API caps it at 300.
const LIST_PAGE_SIZE: &str = "300";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RestDocument {
    name: String,
    #[serde(default)]
    fields: Option<Value>,
    update_time: String,
}

impl TryFrom<RestDocument> for Document {
    type Error = FirebaseError;

    fn try_from(doc: RestDocument) -> Result<Self, Self::Error> {
        let id = doc
            .name
            .rsplit('/')
            .next()
            .unwrap_or_default()
            .to_string();
        let data = match &doc.fields {
            Some(fields) => decode_fields(fields)?,
            None => Map::new(),
        };
        Ok(Self {
            id,
            revision: Revision::new(doc.update_time),
            data,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListResponse {
    #[serde(default)]
    documents: Vec<RestDocument>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommitResponse {
    #[serde(default)]
    write_results: Vec<WriteResult>,
    commit_time: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WriteResult {
    update_time: Option<String>,
    #[serde(default)]
    transform_results: Vec<Value>,
}

impl FirebaseBackend {
    fn document_url(&self, collection: &str, id: &str) -> String {
        format!("{FIRESTORE_HOST}/{}", self.document_name(collection, id))
    }
}

#[async_trait]
impl DocumentStore for FirebaseBackend {
    #[instrument(skip(self))]
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, BackendError> {
        let request = self.authorize(self.client().get(self.document_url(collection, id)));
        match Self::send::<RestDocument>(request).await {
            Ok(doc) => Ok(Some(Document::try_from(doc)?)),
            Err(FirebaseError::Api { status: 404, .. }) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    #[instrument(skip(self))]
    async fn list(&self, collection: &str) -> Result<Vec<Document>, BackendError> {
        let url = format!("{FIRESTORE_HOST}/{}/{collection}", self.documents_root());
        let mut documents = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self
                .client()
                .get(&url)
                .query(&[("pageSize", LIST_PAGE_SIZE)]);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }
            let page: ListResponse = Self::send(self.authorize(request)).await?;
            for doc in page.documents {
                documents.push(Document::try_from(doc)?);
            }
            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        tracing::debug!(count = documents.len(), "Listed documents");
        Ok(documents)
    }

    #[instrument(skip(self, data))]
    async fn create(
        &self,
        collection: &str,
        id: Option<&str>,
        data: Map<String, Value>,
        server_timestamps: &[&str],
    ) -> Result<Document, BackendError> {
        let id = id.map_or_else(auto_id, str::to_string);
        let transforms: Vec<Value> = server_timestamps
            .iter()
            .map(|field| json!({ "fieldPath": field, "setToServerValue": "REQUEST_TIME" }))
            .collect();
        let body = json!({
            "writes": [{
                "update": {
                    "name": self.document_name(collection, &id),
                    "fields": encode_fields(&data),
                },
                "currentDocument": { "exists": false },
                "updateTransforms": transforms,
            }]
        });

        let url = format!("{FIRESTORE_HOST}/{}:commit", self.documents_root());
        let response: CommitResponse =
            Self::send(self.authorize(self.client().post(url).json(&body))).await?;

        let result = response.write_results.into_iter().next();
        let revision = result
            .as_ref()
            .and_then(|r| r.update_time.clone())
            .or(response.commit_time)
            .ok_or_else(|| BackendError::Decode("commit returned no update time".to_string()))?;

        let mut data = data;
        if let Some(result) = result {
            for (field, value) in server_timestamps.iter().zip(&result.transform_results) {
                data.insert((*field).to_string(), decode(value)?);
            }
        }

        Ok(Document {
            id,
            revision: Revision::new(revision),
            data,
        })
    }

    #[instrument(skip(self, value))]
    async fn set_field(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        value: Value,
        precondition: Precondition,
    ) -> Result<Revision, BackendError> {
        let mut request = self
            .client()
            .patch(self.document_url(collection, id))
            .query(&[("updateMask.fieldPaths", field)]);
        request = match &precondition {
            Precondition::None => request,
            Precondition::Exists => request.query(&[("currentDocument.exists", "true")]),
            Precondition::Revision(revision) => {
                request.query(&[("currentDocument.updateTime", revision.as_str())])
            }
        };
        let body = json!({ "fields": { field: encode(&value) } });

        let doc: RestDocument = Self::send(self.authorize(request.json(&body)))
            .await
            .map_err(|e| match e {
                // A missing document fails `exists`/`updateTime` with 404.
                FirebaseError::Api { status: 404, .. }
                    if matches!(precondition, Precondition::Revision(_)) =>
                {
                    BackendError::Conflict(format!("{collection}/{id}"))
                }
                FirebaseError::Api { code, .. } if code == "FAILED_PRECONDITION" => {
                    BackendError::Conflict(format!("{collection}/{id}"))
                }
                other => other.into(),
            })?;

        Ok(Revision::new(doc.update_time))
    }

    #[instrument(skip(self))]
    async fn delete(&self, collection: &str, id: &str) -> Result<(), BackendError> {
        let request = self.authorize(self.client().delete(self.document_url(collection, id)));
        match Self::send::<Value>(request).await {
            Ok(_) | Err(FirebaseError::Api { status: 404, .. }) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

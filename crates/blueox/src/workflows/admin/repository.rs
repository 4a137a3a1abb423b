use async_trait::async_trait;

use super::domain::{
    Client, ClientId, Document, DocumentId, NewClient, NewDocument, NewPayment, Payment, PaymentId,
};
use crate::workflows::applications::{ApplicationRepository, DocumentStorage, RepositoryError};
use crate::workflows::jobs::JobRepository;

#[async_trait]
pub trait ClientRepository: Send + Sync {
    async fn insert_client(&self, client: NewClient) -> Result<Client, RepositoryError>;
    async fn fetch_client(&self, id: &ClientId) -> Result<Option<Client>, RepositoryError>;
    async fn list_clients(&self) -> Result<Vec<Client>, RepositoryError>;
}

#[async_trait]
pub trait DocumentRepository: Send + Sync {
    async fn list_documents(&self) -> Result<Vec<Document>, RepositoryError>;
    async fn documents_for_client(
        &self,
        client_id: &ClientId,
    ) -> Result<Vec<Document>, RepositoryError>;
    async fn fetch_document(&self, id: &DocumentId) -> Result<Option<Document>, RepositoryError>;
    async fn update_document(&self, document: Document) -> Result<Document, RepositoryError>;
    async fn insert_document(&self, document: NewDocument) -> Result<Document, RepositoryError>;
    async fn delete_document(&self, id: &DocumentId) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait PaymentRepository: Send + Sync {
    async fn list_payments(&self) -> Result<Vec<Payment>, RepositoryError>;
    async fn fetch_payment(&self, id: &PaymentId) -> Result<Option<Payment>, RepositoryError>;
    async fn insert_payment(&self, payment: NewPayment) -> Result<Payment, RepositoryError>;
    async fn update_payment(&self, payment: Payment) -> Result<Payment, RepositoryError>;
}

/// Every collection and bucket the review console and portal touch.
pub trait AdminStore:
    ClientRepository
    + DocumentRepository
    + PaymentRepository
    + ApplicationRepository
    + JobRepository
    + DocumentStorage
{
}

impl<T> AdminStore for T where
    T: ClientRepository
        + DocumentRepository
        + PaymentRepository
        + ApplicationRepository
        + JobRepository
        + DocumentStorage
{
}

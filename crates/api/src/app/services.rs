//! Configuration and service wiring.
//!
//! Everything here is in-process: in-memory (or directory-backed) stores, an
//! in-memory job queue, and one background executor thread that runs the
//! invoice extractions against the configured vision endpoint.

use std::path::PathBuf;
use std::sync::Arc;

use forgescan_capture::{CaptureId, InvoiceCapture};
use forgescan_core::TenantId;
use forgescan_extraction::OllamaVisionClient;
use forgescan_infra::{
    register_extraction_handler, CaptureMatch, ExtractionDeps, FileStore, InMemoryFileStore,
    InMemoryJobStore, InMemoryTenantStore, JobExecutor, JobExecutorConfig, JobExecutorHandle,
    LocalDirFileStore, TenantStore,
};
use forgescan_parties::{Supplier, SupplierId};
use forgescan_products::{CatalogItem, CatalogItemId};
use forgescan_purchasing::{PurchaseInvoice, PurchaseInvoiceId};

/// Process configuration, read once at bootstrap.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub jwt_secret: String,
    /// Full URL of the vision model's generate endpoint.
    pub vision_url: String,
    pub vision_model: String,
    /// When set, uploaded images land on disk instead of in memory.
    pub file_storage_dir: Option<PathBuf>,
}

impl ApiConfig {
    pub fn from_env() -> Self {
        let jwt_secret = std::env::var("JWT_SECRET").unwrap_or_else(|_| {
            tracing::warn!("JWT_SECRET not set; using insecure dev default");
            "dev-secret".to_string()
        });

        let vision_url = std::env::var("VISION_MODEL_URL")
            .unwrap_or_else(|_| "http://127.0.0.1:11434/api/generate".to_string());
        let vision_model =
            std::env::var("VISION_MODEL_NAME").unwrap_or_else(|_| "qwen3-vl".to_string());

        let file_storage_dir = std::env::var("FILE_STORAGE_DIR").ok().map(PathBuf::from);

        Self {
            jwt_secret,
            vision_url,
            vision_model,
            file_storage_dir,
        }
    }
}

/// Shared state handed to every handler via an `Extension` layer.
pub struct AppServices {
    captures: Arc<InMemoryTenantStore<InvoiceCapture>>,
    suppliers: Arc<InMemoryTenantStore<Supplier>>,
    items: Arc<InMemoryTenantStore<CatalogItem>>,
    purchase_invoices: Arc<InMemoryTenantStore<PurchaseInvoice>>,
    files: Arc<dyn FileStore>,
    jobs: Arc<InMemoryJobStore>,
    // Held so the extraction thread outlives every request.
    _executor: JobExecutorHandle,
}

/// Wire stores, file storage, the job queue, and the extraction worker.
///
/// Must run inside the server's Tokio runtime: the worker thread bridges its
/// model HTTP calls back into this runtime, so it has to be multi-threaded.
pub fn build_services(config: &ApiConfig) -> AppServices {
    let captures = InMemoryTenantStore::arc();
    let suppliers = InMemoryTenantStore::arc();
    let items = InMemoryTenantStore::arc();
    let purchase_invoices = InMemoryTenantStore::arc();

    let files: Arc<dyn FileStore> = match &config.file_storage_dir {
        Some(dir) => Arc::new(LocalDirFileStore::new(dir.clone())),
        None => InMemoryFileStore::arc(),
    };

    let vision = Arc::new(OllamaVisionClient::new(
        &config.vision_url,
        &config.vision_model,
    ));

    let jobs = InMemoryJobStore::arc();
    let mut executor = JobExecutor::new(jobs.clone());
    register_extraction_handler(
        &mut executor,
        ExtractionDeps {
            captures: captures.clone() as Arc<dyn TenantStore<InvoiceCapture>>,
            suppliers: suppliers.clone() as Arc<dyn TenantStore<Supplier>>,
            items: items.clone() as Arc<dyn TenantStore<CatalogItem>>,
            files: files.clone(),
            vision,
            runtime: tokio::runtime::Handle::current(),
        },
    );
    let executor = executor.spawn(JobExecutorConfig::default().with_name("extraction-executor"));

    AppServices {
        captures,
        suppliers,
        items,
        purchase_invoices,
        files,
        jobs,
        _executor: executor,
    }
}

impl AppServices {
    pub fn capture_get(&self, tenant_id: TenantId, id: &CaptureId) -> Option<InvoiceCapture> {
        self.captures.get(tenant_id, id)
    }

    pub fn capture_save(&self, capture: InvoiceCapture) {
        self.captures.save(capture.tenant_id(), capture);
    }

    pub fn supplier_get(&self, tenant_id: TenantId, id: &SupplierId) -> Option<Supplier> {
        self.suppliers.get(tenant_id, id)
    }

    pub fn supplier_save(&self, supplier: Supplier) {
        self.suppliers.save(supplier.tenant_id(), supplier);
    }

    pub fn suppliers_list(&self, tenant_id: TenantId) -> Vec<Supplier> {
        self.suppliers.list(tenant_id)
    }

    pub fn item_get(&self, tenant_id: TenantId, id: &CatalogItemId) -> Option<CatalogItem> {
        self.items.get(tenant_id, id)
    }

    pub fn item_save(&self, item: CatalogItem) {
        self.items.save(item.tenant_id(), item);
    }

    pub fn items_list(&self, tenant_id: TenantId) -> Vec<CatalogItem> {
        self.items.list(tenant_id)
    }

    pub fn purchase_invoice_get(
        &self,
        tenant_id: TenantId,
        id: &PurchaseInvoiceId,
    ) -> Option<PurchaseInvoice> {
        self.purchase_invoices.get(tenant_id, id)
    }

    pub fn purchase_invoice_save(&self, invoice: PurchaseInvoice) {
        self.purchase_invoices.save(invoice.tenant_id(), invoice);
    }

    pub fn purchase_invoices_list(&self, tenant_id: TenantId) -> Vec<PurchaseInvoice> {
        self.purchase_invoices.list(tenant_id)
    }

    pub fn files(&self) -> &Arc<dyn FileStore> {
        &self.files
    }

    pub fn jobs(&self) -> &Arc<InMemoryJobStore> {
        &self.jobs
    }

    /// Match a capture's extracted fields against the tenant's directory and
    /// catalog. Pure lookup; the caller applies the verdicts.
    pub fn match_capture(&self, capture: &InvoiceCapture) -> CaptureMatch {
        let suppliers = self.suppliers.list(capture.tenant_id());
        let items = self.items.list(capture.tenant_id());
        forgescan_infra::match_capture(capture, &suppliers, &items)
    }
}

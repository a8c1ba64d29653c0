//! Invoice and payment endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::handlers::{party_section, require_access};
use crate::middleware::CurrentUser;
use crate::services::invoice::{
    CreateInvoiceInput, InvoiceFilter, InvoiceService, InvoiceSummary, UpdateInvoiceInput,
};
use crate::services::payment::{PaymentService, RecordPaymentInput};
use crate::AppState;
use shared::models::{Invoice, InvoiceStatus, PartyKind, Payment, Role, Subsection};
use shared::types::{DateRange, PaginatedResponse, Pagination};

#[derive(Debug, Default, Deserialize)]
pub struct InvoiceListQuery {
    pub kind: Option<PartyKind>,
    pub party_id: Option<Uuid>,
    pub status: Option<InvoiceStatus>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl InvoiceListQuery {
    fn date_range(&self) -> AppResult<Option<DateRange>> {
        match (self.from, self.to) {
            (Some(start), Some(end)) => {
                if start > end {
                    return Err(AppError::InvalidDateRange(
                        "'from' must not be after 'to'".to_string(),
                    ));
                }
                Ok(Some(DateRange { start, end }))
            }
            (None, None) => Ok(None),
            _ => Err(AppError::InvalidDateRange(
                "Both 'from' and 'to' are required for date filtering".to_string(),
            )),
        }
    }
}

/// Create an invoice
pub async fn create_invoice(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<CreateInvoiceInput>,
) -> AppResult<Json<Invoice>> {
    require_access(&user, party_section(input.kind), Some(Subsection::Invoices))?;
    let service = InvoiceService::new(state.db);
    let invoice = service.create_invoice(input).await?;
    Ok(Json(invoice))
}

/// Get one invoice with its lines and payment history
pub async fn get_invoice(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(invoice_id): Path<Uuid>,
) -> AppResult<Json<Invoice>> {
    let service = InvoiceService::new(state.db);
    let invoice = service.get_invoice(invoice_id).await?;
    require_access(&user, party_section(invoice.kind), Some(Subsection::Invoices))?;
    Ok(Json(invoice))
}

/// List invoices. Workers must scope the listing to a kind they hold
/// access to; admins may list across kinds.
pub async fn list_invoices(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<InvoiceListQuery>,
) -> AppResult<Json<PaginatedResponse<InvoiceSummary>>> {
    match query.kind {
        Some(kind) => require_access(&user, party_section(kind), Some(Subsection::Invoices))?,
        None if user.role != Role::Admin => {
            return Err(AppError::InsufficientPermissions);
        }
        None => {}
    }

    let date_range = query.date_range()?;
    let filter = InvoiceFilter {
        kind: query.kind,
        party_id: query.party_id,
        status: query.status,
        date_range,
    };
    let pagination = Pagination {
        page: query.page.unwrap_or(1),
        per_page: query.per_page.unwrap_or(20),
    };

    let service = InvoiceService::new(state.db);
    let invoices = service.list_invoices(filter, pagination).await?;
    Ok(Json(invoices))
}

/// Edit an invoice (full replacement of its mutable fields)
pub async fn update_invoice(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(invoice_id): Path<Uuid>,
    Json(input): Json<UpdateInvoiceInput>,
) -> AppResult<Json<Invoice>> {
    let service = InvoiceService::new(state.db);
    let current = service.get_invoice(invoice_id).await?;
    require_access(&user, party_section(current.kind), Some(Subsection::Invoices))?;
    let invoice = service.update_invoice(invoice_id, input).await?;
    Ok(Json(invoice))
}

/// Delete an invoice, reversing its stock movement
pub async fn delete_invoice(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(invoice_id): Path<Uuid>,
) -> AppResult<Json<()>> {
    let service = InvoiceService::new(state.db);
    let current = service.get_invoice(invoice_id).await?;
    require_access(&user, party_section(current.kind), Some(Subsection::Invoices))?;
    service.delete_invoice(invoice_id).await?;
    Ok(Json(()))
}

/// Record a payment against an invoice
pub async fn record_payment(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(invoice_id): Path<Uuid>,
    Json(input): Json<RecordPaymentInput>,
) -> AppResult<Json<Invoice>> {
    let invoice_service = InvoiceService::new(state.db.clone());
    let current = invoice_service.get_invoice(invoice_id).await?;
    require_access(&user, party_section(current.kind), Some(Subsection::Payments))?;
    let service = PaymentService::new(state.db);
    let invoice = service.record_payment(invoice_id, input).await?;
    Ok(Json(invoice))
}

/// List payments recorded against an invoice
pub async fn list_payments(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(invoice_id): Path<Uuid>,
) -> AppResult<Json<Vec<Payment>>> {
    let invoice_service = InvoiceService::new(state.db.clone());
    let current = invoice_service.get_invoice(invoice_id).await?;
    require_access(&user, party_section(current.kind), Some(Subsection::Payments))?;
    let service = PaymentService::new(state.db);
    let payments = service.list_payments(invoice_id).await?;
    Ok(Json(payments))
}

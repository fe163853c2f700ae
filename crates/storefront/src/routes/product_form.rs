//! Product create/edit form shared by the admin and seller screens.
//!
//! The form is posted as `multipart/form-data` so an image file can ride
//! along; an uploaded image is stored first and its URL appended to the
//! image list before the product is saved.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::Multipart,
    response::{IntoResponse, Redirect, Response},
};
use rust_decimal::Decimal;

use gamewar_core::{Category, Dinars, Product, ProductDraft, ProductId};

use super::page::{Choice, Page, ProductCard};
use crate::error::AppError;
use crate::filters;
use crate::middleware::Member;
use crate::models::Flash;
use crate::state::AppState;

/// Where a product screen lives: `/admin/products` or `/seller`.
#[derive(Debug, Clone, Copy)]
pub struct Screen {
    /// List page.
    pub list: &'static str,
    /// Prefix of the new/edit/delete paths.
    pub base: &'static str,
}

impl Screen {
    pub const ADMIN: Self = Self {
        list: "/admin/products",
        base: "/admin/products",
    };
    pub const SELLER: Self = Self {
        list: "/seller",
        base: "/seller/products",
    };

    fn new_path(self) -> String {
        format!("{}/new", self.base)
    }

    fn edit_path(self, id: &ProductId) -> String {
        format!("{}/{id}/edit", self.base)
    }
}

/// Form field values.
pub struct ProductFormView {
    pub action: String,
    pub cancel: &'static str,
    pub title: &'static str,
    pub name_fr: String,
    pub name_ar: String,
    pub description_fr: String,
    pub description_ar: String,
    pub price: String,
    pub stock: u32,
    pub categories: Vec<Choice>,
    pub images: String,
}

impl ProductFormView {
    fn new(screen: Screen, product: Option<&Product>, page: &Page) -> Self {
        let draft = product.map(ProductDraft::from_product).unwrap_or_default();
        let (action, title) = match product {
            Some(p) => (format!("{}/{}", screen.base, p.id), page.t("editProduct")),
            None => (screen.base.to_owned(), page.t("addProduct")),
        };
        let category = draft.category;

        Self {
            action,
            cancel: screen.list,
            title,
            name_fr: draft.name.fr,
            name_ar: draft.name.ar,
            description_fr: draft.description.fr,
            description_ar: draft.description.ar,
            price: draft.price.amount().to_string(),
            stock: draft.stock,
            categories: Category::ALL
                .into_iter()
                .map(|c| Choice::new(c.as_str(), c.translation_key(), c == category, page.lang))
                .collect(),
            images: draft.images.join("\n"),
        }
    }
}

/// Product form template.
#[derive(Template, WebTemplate)]
#[template(path = "products/form.html")]
pub struct ProductFormTemplate {
    pub page: Page,
    pub form: ProductFormView,
}

/// Product management list template.
#[derive(Template, WebTemplate)]
#[template(path = "products/manage.html")]
pub struct ManageProductsTemplate {
    pub page: Page,
    pub title: &'static str,
    pub base: &'static str,
    pub cards: Vec<ProductCard>,
}

/// Render the management list.
///
/// # Errors
///
/// Returns an error if the session cannot be read.
pub async fn list(
    state: &AppState,
    member: &Member,
    screen: Screen,
    title_key: &'static str,
    products: &[Product],
) -> Result<ManageProductsTemplate, AppError> {
    let page = Page::new(&member.viewer, state).await?;
    Ok(ManageProductsTemplate {
        title: page.t(title_key),
        base: screen.base,
        cards: ProductCard::list(products, &page),
        page,
    })
}

/// Render the blank form.
///
/// # Errors
///
/// Returns an error if the session cannot be read.
pub async fn blank(state: &AppState, member: &Member, screen: Screen) -> Result<ProductFormTemplate, AppError> {
    let page = Page::new(&member.viewer, state).await?;
    Ok(ProductFormTemplate {
        form: ProductFormView::new(screen, None, &page),
        page,
    })
}

/// Render the form for an existing product the member may edit.
///
/// # Errors
///
/// Returns an error if the product is missing or belongs to someone else.
pub async fn edit(
    state: &AppState,
    member: &Member,
    screen: Screen,
    id: &ProductId,
) -> Result<ProductFormTemplate, AppError> {
    let product = state.back_office().editable_product(member.editor(), id).await?;
    let page = Page::new(&member.viewer, state).await?;
    Ok(ProductFormTemplate {
        form: ProductFormView::new(screen, Some(&product), &page),
        page,
    })
}

/// An image file posted with the form.
struct ImageUpload {
    file_name: String,
    content_type: String,
    bytes: Vec<u8>,
}

fn multipart_error(e: &axum::extract::multipart::MultipartError) -> AppError {
    AppError::BadRequest(format!("product form: {e}"))
}

async fn read_form(mut multipart: Multipart) -> Result<(ProductDraft, Option<ImageUpload>), AppError> {
    let mut draft = ProductDraft::default();
    let mut upload = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| multipart_error(&e))? {
        let name = field.name().unwrap_or_default().to_owned();
        if name == "image" {
            let file_name = field.file_name().unwrap_or_default().to_owned();
            let content_type = field.content_type().unwrap_or_default().to_owned();
            let bytes = field.bytes().await.map_err(|e| multipart_error(&e))?;
            // Browsers send an empty part when no file was picked.
            if !bytes.is_empty() {
                upload = Some(ImageUpload {
                    file_name,
                    content_type,
                    bytes: bytes.to_vec(),
                });
            }
            continue;
        }

        let value = field.text().await.map_err(|e| multipart_error(&e))?;
        apply_field(&mut draft, &name, &value)?;
    }

    Ok((draft, upload))
}

/// Copy one text field into the draft.
fn apply_field(draft: &mut ProductDraft, name: &str, value: &str) -> Result<(), AppError> {
    let value = value.trim();
    match name {
        "name_fr" => draft.name.fr = value.to_owned(),
        "name_ar" => draft.name.ar = value.to_owned(),
        "description_fr" => draft.description.fr = value.to_owned(),
        "description_ar" => draft.description.ar = value.to_owned(),
        "price" => {
            draft.price = value
                .parse::<Decimal>()
                .map(Dinars::from)
                .map_err(|_| AppError::Invalid("allFieldsRequired"))?;
        }
        "stock" => {
            draft.stock = value
                .parse()
                .map_err(|_| AppError::Invalid("allFieldsRequired"))?;
        }
        "category" => {
            draft.category = value
                .parse()
                .map_err(|_| AppError::Invalid("allFieldsRequired"))?;
        }
        "images" => draft.images = value.lines().map(str::to_owned).collect(),
        other => tracing::debug!(field = other, "Ignoring unknown product field"),
    }
    Ok(())
}

/// Save the posted form: create when `id` is `None`, update otherwise.
///
/// Success returns to the list; failure returns to the form with a flash.
///
/// # Errors
///
/// Returns an error only if the session cannot be written.
pub async fn submit(
    state: &AppState,
    member: &Member,
    screen: Screen,
    id: Option<&ProductId>,
    multipart: Multipart,
) -> Result<Response, AppError> {
    let result = async {
        let (mut draft, upload) = read_form(multipart).await?;
        let office = state.back_office();
        if let Some(image) = upload {
            let url = office
                .upload_image(member.editor(), &image.file_name, &image.content_type, image.bytes)
                .await?;
            draft.images.push(url);
        }
        office.save_product(member.editor(), id, draft).await
    }
    .await;

    let viewer = &member.viewer;
    match result {
        Ok(_) => {
            viewer.flash(Flash::success("productSaved")).await?;
            Ok(Redirect::to(screen.list).into_response())
        }
        Err(err) => {
            viewer.flash_error(&err).await?;
            let back = id.map_or_else(|| screen.new_path(), |id| screen.edit_path(id));
            Ok(Redirect::to(&back).into_response())
        }
    }
}

/// Delete a product the member may edit.
///
/// # Errors
///
/// Returns an error only if the session cannot be written.
pub async fn delete(state: &AppState, member: &Member, screen: Screen, id: &ProductId) -> Result<Response, AppError> {
    let result = state.back_office().delete_product(member.editor(), id).await;
    super::finish(&member.viewer, result, "productDeleted", screen.list).await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use gamewar_core::Localized;

    use super::*;

    #[test]
    fn test_apply_field_parses_numbers_and_lists() {
        let mut draft = ProductDraft::default();
        apply_field(&mut draft, "name_fr", "  Manette PS5 ").unwrap();
        apply_field(&mut draft, "price", "8500.50").unwrap();
        apply_field(&mut draft, "stock", "12").unwrap();
        apply_field(&mut draft, "category", "giftCards").unwrap();
        apply_field(&mut draft, "images", "https://a/1.png\n\nhttps://a/2.png").unwrap();

        assert_eq!(draft.name, Localized::new("Manette PS5", ""));
        assert_eq!(draft.price, Dinars::from(Decimal::new(850_050, 2)));
        assert_eq!(draft.stock, 12);
        assert_eq!(draft.category, Category::GiftCards);
        // Blank lines are dropped when the draft is validated.
        assert_eq!(draft.images.len(), 3);
    }

    #[test]
    fn test_apply_field_rejects_bad_numbers() {
        let mut draft = ProductDraft::default();
        for (field, value) in [("price", "abc"), ("stock", "-1"), ("category", "spaceships")] {
            let err = apply_field(&mut draft, field, value).unwrap_err();
            assert_eq!(err.flash_key(), "allFieldsRequired");
        }
    }

    #[test]
    fn test_screen_paths() {
        let id = ProductId::new("p1");
        assert_eq!(Screen::ADMIN.new_path(), "/admin/products/new");
        assert_eq!(Screen::SELLER.edit_path(&id), "/seller/products/p1/edit");
    }
}

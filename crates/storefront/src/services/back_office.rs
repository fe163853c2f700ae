//! Admin and seller operations.
//!
//! # Ownership
//!
//! Sellers may only edit, delete or restock products they created. Admins
//! may touch any product. Every product write drops the catalog cache, and
//! every profile write drops that profile's cache entry.

use chrono::Utc;
use tracing::instrument;

use gamewar_core::{
    CreditAdjustment, CreditLogId, Dinars, Email, Product, ProductDraft, ProductId, UserId,
    UserProfile, UserRole, UserStatus,
};

use super::{CatalogService, ProfileResolver};
use crate::backend::{AuthSession, Backend, ProfilePatch, Upload, new_document_id};
use crate::error::AppError;

/// Longest file name kept in an upload path.
const MAX_FILE_NAME_CHARS: usize = 80;

/// The admin "create user" form.
#[derive(Debug, Clone, Default)]
pub struct NewAccount {
    pub email: String,
    pub password: String,
    pub display_name: String,
    pub phone: String,
    pub role: UserRole,
    pub credit: Dinars,
}

impl NewAccount {
    fn validate(self) -> Result<Self, AppError> {
        let email = Email::parse(&self.email).map_err(|e| {
            tracing::debug!(error = %e, "Rejected account email");
            AppError::Invalid("allFieldsRequired")
        })?;
        let account = Self {
            email: email.into_inner(),
            display_name: self.display_name.trim().to_owned(),
            phone: self.phone.trim().to_owned(),
            ..self
        };
        if account.password.is_empty() || account.display_name.is_empty() || account.phone.is_empty() {
            return Err(AppError::Invalid("allFieldsRequired"));
        }
        Ok(account)
    }
}

/// Who is acting on a product.
#[derive(Debug, Clone, Copy)]
pub struct Editor<'a> {
    pub auth: &'a AuthSession,
    pub is_admin: bool,
}

impl Editor<'_> {
    fn ensure_can_edit(&self, product: &Product) -> Result<(), AppError> {
        if self.is_admin || product.is_owned_by(&self.auth.uid) {
            Ok(())
        } else {
            tracing::warn!(
                uid = %self.auth.uid,
                product_id = %product.id,
                "Refused edit of another seller's product"
            );
            Err(AppError::Forbidden(format!("product {}", product.id)))
        }
    }
}

/// Back-office operations for one request.
pub struct BackOffice<'a> {
    backend: &'a Backend,
    profiles: &'a ProfileResolver,
    catalog: &'a CatalogService,
}

impl<'a> BackOffice<'a> {
    #[must_use]
    pub const fn new(
        backend: &'a Backend,
        profiles: &'a ProfileResolver,
        catalog: &'a CatalogService,
    ) -> Self {
        Self {
            backend,
            profiles,
            catalog,
        }
    }

    // =========================================================================
    // Users
    // =========================================================================

    /// Every stored profile, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the collection cannot be read.
    pub async fn users(&self, admin: &AuthSession) -> Result<Vec<UserProfile>, AppError> {
        let mut users = self.backend.list_profiles(admin).await?;
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(users)
    }

    /// Create an account and its profile. The account starts active.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Invalid("allFieldsRequired")` for a blank field, or
    /// the auth service's refusal.
    #[instrument(skip(self, admin, account), fields(email = %account.email))]
    pub async fn create_account(&self, admin: &AuthSession, account: NewAccount) -> Result<UserProfile, AppError> {
        let account = account.validate()?;
        let uid = self.backend.create_account(&account.email, &account.password).await?;

        let profile = UserProfile {
            uid,
            email: account.email,
            role: account.role,
            status: UserStatus::Active,
            credit: account.credit,
            created_at: Utc::now(),
            display_name: Some(account.display_name),
            phone: Some(account.phone),
        };
        self.backend.put_profile(admin, &profile).await?;

        tracing::info!(uid = %profile.uid, role = %profile.role, "Account created");
        Ok(profile)
    }

    async fn patch_profile(&self, admin: &AuthSession, uid: &UserId, patch: &ProfilePatch) -> Result<(), AppError> {
        self.backend.update_profile(admin, uid, patch).await?;
        self.profiles.invalidate(uid).await;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns an error if the write fails.
    #[instrument(skip(self, admin))]
    pub async fn set_role(&self, admin: &AuthSession, uid: &UserId, role: UserRole) -> Result<(), AppError> {
        self.patch_profile(admin, uid, &ProfilePatch::role(role)).await
    }

    /// # Errors
    ///
    /// Returns an error if the write fails.
    #[instrument(skip(self, admin))]
    pub async fn set_status(&self, admin: &AuthSession, uid: &UserId, status: UserStatus) -> Result<(), AppError> {
        self.patch_profile(admin, uid, &ProfilePatch::status(status)).await
    }

    /// Apply a credit adjustment and record it in the ledger.
    ///
    /// Returns the new balance.
    ///
    /// # Errors
    ///
    /// Returns an error for a zero amount, an unknown user, or a failed
    /// write.
    #[instrument(skip(self, admin, adjustment), fields(amount = adjustment.amount))]
    pub async fn adjust_credit(
        &self,
        admin: &AuthSession,
        uid: &UserId,
        adjustment: &CreditAdjustment,
    ) -> Result<Dinars, AppError> {
        let profile = self
            .backend
            .get_profile(admin, uid)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("user {uid}")))?;
        let (balance, log) = adjustment.apply(&profile, Some(&admin.email), Utc::now())?;

        self.patch_profile(admin, uid, &ProfilePatch::credit(balance)).await?;
        let log = log.with_id(CreditLogId::new(new_document_id()));
        self.backend.add_credit_log(admin, &log).await?;

        tracing::info!(uid = %uid, %balance, "Credit adjusted");
        Ok(balance)
    }

    // =========================================================================
    // Products
    // =========================================================================

    /// A product the editor may change.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` or `Forbidden`.
    pub async fn editable_product(&self, editor: Editor<'_>, id: &ProductId) -> Result<Product, AppError> {
        let product = self
            .backend
            .get_product(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("product {id}")))?;
        editor.ensure_can_edit(&product)?;
        Ok(product)
    }

    /// Create (`id` is `None`) or update a product from the form.
    ///
    /// # Errors
    ///
    /// Returns an error for an invalid form, a product the editor does not
    /// own, or a failed write.
    #[instrument(skip(self, editor, draft), fields(uid = %editor.auth.uid))]
    pub async fn save_product(
        &self,
        editor: Editor<'_>,
        id: Option<&ProductId>,
        draft: ProductDraft,
    ) -> Result<Product, AppError> {
        let draft = draft.validate()?;
        let now = Utc::now();

        let product = match id {
            None => {
                let product = Product::new(
                    ProductId::new(new_document_id()),
                    draft,
                    Some(editor.auth.uid.clone()),
                    now,
                );
                self.backend.create_product(editor.auth, &product).await?;
                product
            }
            Some(id) => {
                let mut product = self.editable_product(editor, id).await?;
                product.apply_draft(draft, now);
                self.backend.update_product(editor.auth, &product).await?;
                product
            }
        };

        self.catalog.invalidate().await;
        tracing::info!(product_id = %product.id, "Product saved");
        Ok(product)
    }

    /// # Errors
    ///
    /// Returns an error for a product the editor does not own or a failed
    /// delete.
    #[instrument(skip(self, editor), fields(uid = %editor.auth.uid))]
    pub async fn delete_product(&self, editor: Editor<'_>, id: &ProductId) -> Result<(), AppError> {
        self.editable_product(editor, id).await?;
        self.backend.delete_product(editor.auth, id).await?;
        self.catalog.invalidate().await;
        tracing::info!(product_id = %id, "Product deleted");
        Ok(())
    }

    /// Store a product image under `products/{uid}/{millis}_{file}`.
    ///
    /// # Errors
    ///
    /// Returns an error for a non-image upload or a failed upload.
    #[instrument(skip(self, editor, bytes), fields(uid = %editor.auth.uid, size = bytes.len()))]
    pub async fn upload_image(
        &self,
        editor: Editor<'_>,
        file_name: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<String, AppError> {
        if !content_type.starts_with("image/") || bytes.is_empty() {
            return Err(AppError::BadRequest(format!(
                "not an image upload: {content_type}"
            )));
        }
        let upload = Upload {
            path: image_path(&editor.auth.uid, file_name, Utc::now().timestamp_millis()),
            content_type: content_type.to_owned(),
            bytes,
        };
        Ok(self.backend.upload_image(editor.auth, &upload).await?)
    }

    /// Save a manual stock change and append it to the product's history.
    ///
    /// # Errors
    ///
    /// Returns `StockError::Unchanged` when the stock is the same, or an
    /// error for a product the editor does not own or a failed write.
    #[instrument(skip(self, editor), fields(uid = %editor.auth.uid))]
    pub async fn update_stock(&self, editor: Editor<'_>, id: &ProductId, new_stock: u32) -> Result<Product, AppError> {
        let mut product = self.editable_product(editor, id).await?;
        let entry = product.stock_change(new_stock, &editor.auth.email, Utc::now())?;
        product.apply_stock_change(entry);

        self.backend.update_stock(editor.auth, &product).await?;
        self.catalog.invalidate().await;
        tracing::info!(product_id = %id, stock = new_stock, "Stock updated");
        Ok(product)
    }
}

/// Object path of an uploaded product image.
fn image_path(owner: &UserId, file_name: &str, millis: i64) -> String {
    let name: String = file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .take(MAX_FILE_NAME_CHARS)
        .collect();
    let name = if name.is_empty() { "image".to_owned() } else { name };
    format!("products/{owner}/{millis}_{name}")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use gamewar_core::{Category, CreditLogKind, Localized, StockError};

    use super::*;
    use crate::backend::MemoryBackend;

    struct Fixture {
        memory: MemoryBackend,
        backend: Backend,
        profiles: ProfileResolver,
        catalog: CatalogService,
        admin: AuthSession,
        seller: AuthSession,
    }

    impl Fixture {
        async fn new() -> Self {
            let memory = MemoryBackend::new();
            for (email, uid, role) in [
                ("admin@gamewar.dz", "admin", UserRole::Admin),
                ("seller@gamewar.dz", "seller", UserRole::Seller),
            ] {
                let profile = UserProfile {
                    role,
                    ..UserProfile::first_sign_in(UserId::new(uid), email, Utc::now())
                };
                memory.add_account(email, "123456", Some(profile)).await;
            }
            let backend = Backend::from(memory.clone());
            let admin = backend.sign_in("admin@gamewar.dz", "123456").await.unwrap();
            let seller = backend.sign_in("seller@gamewar.dz", "123456").await.unwrap();
            Self {
                memory,
                profiles: ProfileResolver::new(backend.clone()),
                catalog: CatalogService::new(backend.clone()),
                backend,
                admin,
                seller,
            }
        }

        fn office(&self) -> BackOffice<'_> {
            BackOffice::new(&self.backend, &self.profiles, &self.catalog)
        }

        fn admin(&self) -> Editor<'_> {
            Editor {
                auth: &self.admin,
                is_admin: true,
            }
        }

        fn seller(&self) -> Editor<'_> {
            Editor {
                auth: &self.seller,
                is_admin: false,
            }
        }
    }

    fn draft(name: &str, stock: u32) -> ProductDraft {
        ProductDraft {
            name: Localized::new(name, "منتج"),
            price: Dinars::from_whole(1200),
            stock,
            category: Category::Wifi,
            images: vec![" ".to_owned(), "https://img/1.png".to_owned()],
            ..ProductDraft::default()
        }
    }

    #[tokio::test]
    async fn test_create_account_requires_every_field() {
        let fx = Fixture::new().await;
        let err = fx
            .office()
            .create_account(
                &fx.admin,
                NewAccount {
                    email: "x@gamewar.dz".to_owned(),
                    password: "123456".to_owned(),
                    ..NewAccount::default()
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.flash_key(), "allFieldsRequired");

        let err = fx
            .office()
            .create_account(
                &fx.admin,
                NewAccount {
                    email: "pas-un-email".to_owned(),
                    password: "123456".to_owned(),
                    display_name: "Boutique".to_owned(),
                    phone: "0555".to_owned(),
                    ..NewAccount::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Invalid("allFieldsRequired")));

        let profile = fx
            .office()
            .create_account(
                &fx.admin,
                NewAccount {
                    email: " shop@gamewar.dz ".to_owned(),
                    password: "123456".to_owned(),
                    display_name: "Boutique".to_owned(),
                    phone: "0555".to_owned(),
                    role: UserRole::Seller,
                    credit: Dinars::from_whole(250),
                },
            )
            .await
            .unwrap();
        assert_eq!(profile.status, UserStatus::Active);
        assert_eq!(
            fx.memory.profile(&profile.uid).await.unwrap().credit,
            Dinars::from_whole(250)
        );
        assert!(fx.backend.sign_in("shop@gamewar.dz", "123456").await.is_ok());
    }

    #[tokio::test]
    async fn test_adjust_credit_writes_ledger() {
        let fx = Fixture::new().await;
        let seller = UserId::new("seller");
        let adjustment = CreditAdjustment {
            amount: -30,
            reason: " spam ".to_owned(),
        };

        let balance = fx.office().adjust_credit(&fx.admin, &seller, &adjustment).await.unwrap();
        assert_eq!(balance, Dinars::from_whole(70));
        assert_eq!(
            fx.memory.profile(&seller).await.unwrap().credit,
            Dinars::from_whole(70)
        );

        let logs = fx.backend.credit_logs_for(&fx.admin, &seller).await.unwrap();
        let log = logs.first().unwrap();
        assert_eq!(log.amount, Dinars::from_whole(-30));
        assert_eq!(log.kind, CreditLogKind::AdminAdjustment);
        assert_eq!(log.reason, "spam");
        assert_eq!(log.actor.as_deref(), Some("admin@gamewar.dz"));
    }

    #[tokio::test]
    async fn test_sellers_only_edit_their_products() {
        let fx = Fixture::new().await;
        let mine = fx.office().save_product(fx.seller(), None, draft("Routeur", 4)).await.unwrap();
        let admins = fx.office().save_product(fx.admin(), None, draft("Switch", 4)).await.unwrap();
        assert_eq!(mine.images, ["https://img/1.png"]);
        assert!(mine.is_owned_by(&fx.seller.uid));

        let err = fx
            .office()
            .save_product(fx.seller(), Some(&admins.id), draft("Volé", 1))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
        assert!(fx.office().delete_product(fx.seller(), &admins.id).await.is_err());

        let edited = fx
            .office()
            .save_product(fx.admin(), Some(&mine.id), draft("Routeur AX", 4))
            .await
            .unwrap();
        assert_eq!(edited.name.fr, "Routeur AX");
        assert_eq!(edited.created_by, mine.created_by);

        fx.office().delete_product(fx.seller(), &mine.id).await.unwrap();
        assert!(fx.backend.get_product(&mine.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_stock_appends_history() {
        let fx = Fixture::new().await;
        let product = fx.office().save_product(fx.admin(), None, draft("Câble", 4)).await.unwrap();

        let err = fx.office().update_stock(fx.admin(), &product.id, 4).await.unwrap_err();
        assert!(matches!(err, AppError::Stock(StockError::Unchanged)));

        let updated = fx.office().update_stock(fx.admin(), &product.id, 1).await.unwrap();
        assert_eq!(updated.stock, 1);
        let entry = updated.stock_history.first().unwrap();
        assert_eq!((entry.previous_stock, entry.new_stock), (4, 1));
        assert_eq!(entry.updated_by, "admin@gamewar.dz");

        let stored = fx.backend.get_product(&product.id).await.unwrap().unwrap();
        assert_eq!(stored.stock_history.len(), 1);
    }

    #[tokio::test]
    async fn test_upload_rejects_non_images() {
        let fx = Fixture::new().await;
        assert!(
            fx.office()
                .upload_image(fx.seller(), "notes.txt", "text/plain", b"x".to_vec())
                .await
                .is_err()
        );
        let url = fx
            .office()
            .upload_image(fx.seller(), "pad.png", "image/png", b"png".to_vec())
            .await
            .unwrap();
        assert!(url.starts_with("data:image/png;base64,"));
    }

    #[test]
    fn test_image_path() {
        let owner = UserId::new("u1");
        assert_eq!(
            image_path(&owner, "C:\\photos\\ma manette.png", 1_700_000_000_000),
            "products/u1/1700000000000_ma_manette.png"
        );
        assert_eq!(image_path(&owner, "", 5), "products/u1/5_image");
    }
}

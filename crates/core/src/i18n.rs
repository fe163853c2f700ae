//! French/Arabic translations.
//!
//! The shop ships in two languages. French is the default and Arabic is
//! rendered right-to-left. Product text is stored in both languages on the
//! document itself ([`Localized`]); interface strings come from the static
//! table behind [`translate`].

use serde::{Deserialize, Serialize};

/// Interface language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Fr,
    Ar,
}

impl Language {
    /// ISO 639-1 code, also used for the `lang` attribute.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Fr => "fr",
            Self::Ar => "ar",
        }
    }

    #[must_use]
    pub const fn is_rtl(self) -> bool {
        matches!(self, Self::Ar)
    }

    /// Value for the `dir` attribute.
    #[must_use]
    pub const fn dir(self) -> &'static str {
        if self.is_rtl() { "rtl" } else { "ltr" }
    }

    /// The language the navbar toggle switches to.
    #[must_use]
    pub const fn other(self) -> Self {
        match self {
            Self::Fr => Self::Ar,
            Self::Ar => Self::Fr,
        }
    }

    /// Label shown on the toggle that switches *to* this language.
    #[must_use]
    pub const fn toggle_label(self) -> &'static str {
        match self {
            Self::Fr => "FR",
            Self::Ar => "AR",
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// The requested language code is not supported.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported language: {0}")]
pub struct UnknownLanguage(pub String);

impl std::str::FromStr for Language {
    type Err = UnknownLanguage;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fr" => Ok(Self::Fr),
            "ar" => Ok(Self::Ar),
            _ => Err(UnknownLanguage(s.to_owned())),
        }
    }
}

/// A text stored in both languages.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Localized {
    pub fr: String,
    pub ar: String,
}

impl Localized {
    #[must_use]
    pub fn new(fr: impl Into<String>, ar: impl Into<String>) -> Self {
        Self {
            fr: fr.into(),
            ar: ar.into(),
        }
    }

    #[must_use]
    pub fn get(&self, lang: Language) -> &str {
        match lang {
            Language::Fr => &self.fr,
            Language::Ar => &self.ar,
        }
    }

    /// The text in the language that is *not* `lang`, shown as a hint on
    /// back-office screens.
    #[must_use]
    pub fn other(&self, lang: Language) -> &str {
        self.get(lang.other())
    }
}

/// `(key, fr, ar)`
static TRANSLATIONS: &[(&str, &str, &str)] = &[
    ("siteName", "GameWar", "GameWar"),
    ("home", "Accueil", "الرئيسية"),
    ("products", "Produits", "المنتجات"),
    ("cart", "Panier", "السلة"),
    ("orders", "Commandes", "الطلبات"),
    ("dashboard", "Tableau de bord", "لوحة التحكم"),
    ("login", "Connexion", "تسجيل الدخول"),
    ("logout", "Déconnexion", "تسجيل الخروج"),
    ("email", "Email", "البريد الإلكتروني"),
    ("password", "Mot de passe", "كلمة المرور"),
    ("signIn", "Se connecter", "دخول"),
    ("createAccount", "Créer un compte", "إنشاء حساب"),
    (
        "createAccountMessage",
        "Créez un compte activé pour voir les prix",
        "أنشئ حسابًا مفعلًا لرؤية الأسعار",
    ),
    (
        "accountActivationRequired",
        "Votre compte doit être activé par un administrateur pour voir les prix",
        "يجب تفعيل حسابك من قبل المدير لرؤية الأسعار",
    ),
    ("priceHidden", "Prix masqué", "السعر مخفي"),
    ("price", "Prix", "السعر"),
    ("addToCart", "Ajouter au panier", "أضف إلى السلة"),
    ("outOfStock", "Rupture de stock", "نفذت الكمية"),
    ("inStock", "En stock", "متوفر"),
    ("category", "Catégorie", "الفئة"),
    ("allCategories", "Toutes les catégories", "كل الفئات"),
    ("controllers", "Manettes", "يدات التحكم"),
    ("headsets", "Casques Gaming", "سماعات الألعاب"),
    ("cables", "Câbles", "الكابلات"),
    ("wifi", "WiFi & Réseau", "واي فاي وشبكات"),
    ("accessories", "Accessoires", "الإكسسوارات"),
    ("consoles", "Consoles", "أجهزة الألعاب"),
    ("giftCards", "Cartes cadeaux", "بطاقات الهدايا"),
    ("search", "Rechercher...", "بحث..."),
    ("myCredit", "Mon crédit", "رصيدي"),
    ("credits", "crédits", "نقطة"),
    ("myOrders", "Mes commandes", "طلباتي"),
    ("adminPanel", "Panneau Admin", "لوحة المدير"),
    ("sellerPanel", "Panneau Vendeur", "لوحة البائع"),
    ("manageUsers", "Gérer les utilisateurs", "إدارة المستخدمين"),
    ("manageProducts", "Gérer les produits", "إدارة المنتجات"),
    ("addProduct", "Ajouter un produit", "إضافة منتج"),
    ("editProduct", "Modifier le produit", "تعديل المنتج"),
    ("deleteProduct", "Supprimer", "حذف"),
    ("save", "Enregistrer", "حفظ"),
    ("cancel", "Annuler", "إلغاء"),
    ("name", "Nom", "الاسم"),
    ("description", "Description", "الوصف"),
    ("stock", "Stock", "المخزون"),
    ("image", "Image URL", "رابط الصورة"),
    ("role", "Rôle", "الدور"),
    ("status", "Statut", "الحالة"),
    ("active", "Actif", "نشط"),
    ("pending", "En attente", "قيد الانتظار"),
    ("suspended", "Suspendu", "معلق"),
    ("guest", "Invité", "زائر"),
    ("user", "Utilisateur", "مستخدم"),
    ("seller", "Vendeur", "بائع"),
    ("admin", "Admin", "مدير"),
    ("actions", "Actions", "الإجراءات"),
    ("activate", "Activer", "تفعيل"),
    ("suspend", "Suspendre", "تعليق"),
    ("adjustCredit", "Ajuster le crédit", "تعديل الرصيد"),
    ("total", "Total", "المجموع"),
    ("checkout", "Commander", "إتمام الطلب"),
    ("emptyCart", "Votre panier est vide", "سلتك فارغة"),
    ("phone", "Téléphone", "رقم الهاتف"),
    ("address", "Adresse de livraison", "عنوان التوصيل"),
    ("notes", "Notes", "ملاحظات"),
    ("placeOrder", "Passer la commande", "تأكيد الطلب"),
    ("orderPlaced", "Commande passée avec succès", "تم الطلب بنجاح"),
    ("contactUs", "Contactez-nous", "اتصل بنا"),
    ("whatsapp", "WhatsApp", "واتساب"),
    ("cashOnDelivery", "Paiement à la livraison", "الدفع عند الاستلام"),
    ("da", "DA", "دج"),
    ("quantity", "Quantité", "الكمية"),
    ("remove", "Retirer", "إزالة"),
    ("createdAt", "Créé le", "تاريخ الإنشاء"),
    ("orderStatus", "Statut", "الحالة"),
    ("confirmed", "Confirmé", "مؤكد"),
    ("delivered", "Livré", "تم التوصيل"),
    ("cancelled", "Annulé", "ملغي"),
    ("creditHistory", "Historique du crédit", "سجل الرصيد"),
    ("purchase", "Achat", "شراء"),
    ("abandoned_cart", "Panier abandonné", "سلة متروكة"),
    ("spam", "Spam", "سبام"),
    ("admin_adjustment", "Ajustement admin", "تعديل من المدير"),
    ("reason", "Raison", "السبب"),
    ("amount", "Montant", "المبلغ"),
    ("date", "Date", "التاريخ"),
    ("noOrders", "Aucune commande", "لا توجد طلبات"),
    ("noProducts", "Aucun produit trouvé", "لم يتم العثور على منتجات"),
    ("loading", "Chargement...", "جاري التحميل..."),
    ("error", "Erreur", "خطأ"),
    ("success", "Succès", "نجاح"),
    ("loginRequired", "Connexion requise", "يجب تسجيل الدخول"),
    (
        "accountNotActivated",
        "Compte non activé. Contactez l'administrateur.",
        "الحساب غير مفعل. اتصل بالمدير.",
    ),
    ("lowCredit", "Crédit insuffisant", "الرصيد غير كافٍ"),
    ("viewDetails", "Voir détails", "عرض التفاصيل"),
    ("close", "Fermer", "إغلاق"),
    ("confirm", "Confirmer", "تأكيد"),
    // Screens rendered on the server need a few more strings.
    ("heroTagline", "Votre destination gaming en Algérie", "وجهتك للألعاب في الجزائر"),
    ("viewAll", "Voir tout", "عرض الكل"),
    ("allOrders", "Toutes les commandes", "كل الطلبات"),
    ("lastItems", "Derniers articles", "آخر القطع"),
    ("lowStock", "Stock faible", "مخزون منخفض"),
    ("stockOk", "Stock OK", "المخزون جيد"),
    ("all", "Tous", "الكل"),
    ("stockManagement", "Gestion du stock", "إدارة المخزون"),
    (
        "stockManagementHint",
        "Modifiez les quantités en stock et sauvegardez les changements pour chaque produit.",
        "عدّل كميات المخزون واحفظ التغييرات لكل منتج.",
    ),
    ("searchProduct", "Rechercher un produit...", "ابحث عن منتج..."),
    ("stockQuantity", "Quantité en stock", "الكمية في المخزون"),
    ("almostSoldOut", "Ce produit est presque épuisé", "هذا المنتج على وشك النفاد"),
    ("history", "Historique", "السجل"),
    ("stockHistory", "Historique du stock", "سجل المخزون"),
    ("noHistory", "Aucun historique", "لا يوجد سجل"),
    ("previousStock", "Ancien stock", "المخزون السابق"),
    ("newStock", "Nouveau stock", "المخزون الجديد"),
    ("updatedBy", "Modifié par", "عدّله"),
    ("orderCount", "Commandes", "عدد الطلبات"),
    ("uploadImage", "Télécharger une image", "رفع صورة"),
    ("fullName", "Nom complet", "الاسم الكامل"),
    ("details", "Détails", "التفاصيل"),
    ("confirmOrder", "Confirmer", "تأكيد"),
    ("markDelivered", "Livrée", "تم التسليم"),
    ("downloadInvoice", "Télécharger PDF", "تحميل الفاتورة"),
    ("whatsappInvoice", "WhatsApp + PDF", "واتساب + الفاتورة"),
    ("subtotal", "HT", "دون ضريبة"),
    ("tax", "TVA", "الضريبة"),
    ("totalWithTax", "TTC", "مع الضريبة"),
    ("customer", "Client", "الزبون"),
    ("balance", "Solde", "الرصيد"),
    ("nameFr", "Nom (français)", "الاسم (فرنسي)"),
    ("nameAr", "Nom (arabe)", "الاسم (عربي)"),
    ("descriptionFr", "Description (français)", "الوصف (فرنسي)"),
    ("descriptionAr", "Description (arabe)", "الوصف (عربي)"),
    ("imageUrls", "Images (une URL par ligne)", "الصور (رابط في كل سطر)"),
    ("initialCredit", "Crédit initial", "الرصيد الأولي"),
    ("order", "Commande", "طلب"),
    ("myProducts", "Mes produits", "منتجاتي"),
    // Flash messages.
    ("userCreated", "Utilisateur créé avec succès", "تم إنشاء المستخدم بنجاح"),
    ("roleUpdated", "Rôle mis à jour avec succès", "تم تحديث الدور بنجاح"),
    ("statusUpdated", "Statut mis à jour avec succès", "تم تحديث الحالة بنجاح"),
    ("creditAdjusted", "Crédit ajusté avec succès", "تم تعديل الرصيد بنجاح"),
    ("productSaved", "Produit sauvegardé avec succès", "تم حفظ المنتج بنجاح"),
    ("productDeleted", "Produit supprimé avec succès", "تم حذف المنتج بنجاح"),
    ("stockUpdated", "Stock mis à jour avec succès", "تم تحديث المخزون بنجاح"),
    ("noChanges", "Aucun changement à sauvegarder", "لا توجد تغييرات للحفظ"),
    ("allFieldsRequired", "Tous les champs sont requis", "كل الحقول مطلوبة"),
    ("addedToCart", "Ajouté au panier", "أضيف إلى السلة"),
    ("invalidCredentials", "Email ou mot de passe incorrect", "البريد أو كلمة المرور غير صحيحة"),
    ("emailExists", "Cet email est déjà utilisé", "هذا البريد مستخدم بالفعل"),
    ("weakPassword", "Mot de passe trop faible", "كلمة المرور ضعيفة جدًا"),
    ("phoneUnavailable", "Numéro non disponible", "الرقم غير متوفر"),
    ("invoiceError", "Erreur PDF", "خطأ في الفاتورة"),
    ("tooManyRequests", "Trop de tentatives, réessayez plus tard", "محاولات كثيرة، أعد المحاولة لاحقًا"),
    ("notFound", "Page introuvable", "الصفحة غير موجودة"),
];

/// Look up an interface string.
///
/// Unknown keys come back unchanged, so a missing entry shows up on the page
/// as its key instead of an empty label.
#[must_use]
pub fn translate<'a>(key: &'a str, lang: Language) -> &'a str {
    TRANSLATIONS
        .iter()
        .find(|(k, _, _)| *k == key)
        .map_or(key, |&(_, fr, ar)| match lang {
            Language::Fr => fr,
            Language::Ar => ar,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_translate_both_languages() {
        assert_eq!(translate("cart", Language::Fr), "Panier");
        assert_eq!(translate("cart", Language::Ar), "السلة");
        assert_eq!(translate("da", Language::Ar), "دج");
    }

    #[test]
    fn test_translate_unknown_key_falls_back() {
        assert_eq!(translate("noSuchKey", Language::Ar), "noSuchKey");
    }

    #[test]
    fn test_keys_are_unique() {
        let mut keys: Vec<&str> = TRANSLATIONS.iter().map(|(k, _, _)| *k).collect();
        keys.sort_unstable();
        let before = keys.len();
        keys.dedup();
        assert_eq!(before, keys.len());
    }

    #[test]
    fn test_language_parsing_and_direction() {
        assert_eq!("AR".parse::<Language>().unwrap(), Language::Ar);
        assert_eq!("fr".parse::<Language>().unwrap(), Language::Fr);
        assert!("en".parse::<Language>().is_err());
        assert!(Language::Ar.is_rtl());
        assert_eq!(Language::Fr.dir(), "ltr");
        assert_eq!(Language::default(), Language::Fr);
        assert_eq!(Language::Fr.other(), Language::Ar);
    }

    #[test]
    fn test_localized_get() {
        let name = Localized::new("Manette PS5", "يد تحكم PS5");
        assert_eq!(name.get(Language::Fr), "Manette PS5");
        assert_eq!(name.get(Language::Ar), "يد تحكم PS5");
        assert_eq!(name.other(Language::Fr), "يد تحكم PS5");
    }
}

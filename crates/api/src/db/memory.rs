//! In-process store for tests and local development.
//!
//! Each logical store sits behind its own mutex, so every trait method is a
//! single critical section and read-modify-write paths (discount usage,
//! referral crediting, wishlist edits) cannot interleave.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tokio::sync::Mutex;

use joestar_core::affiliate::{AffiliateProfile, Referral, redeem_code_candidates};
use joestar_core::catalog::{Product, ProductQuery};
use joestar_core::discount::DiscountCode;
use joestar_core::order::{NewOrder, Order, OrderItem};
use joestar_core::wishlist::{Wishlist, WishlistError};
use joestar_core::{
    ContactMessageId, DiscountId, EbookId, Email, OrderId, OrderItemId, OrderStatus, ProductId,
    ReferralId, ReferralStatus, SubscriberId, TestimonialId, UserId,
};

use super::{
    AffiliateStore, CatalogStore, ContactStore, CreditedReferral, DiscountStore, DUPLICATE_EMAIL,
    EbookStore, NewsletterStore, OrderStore, REDEEM_CODE_TAKEN, RepositoryError, Store,
    TestimonialStore, UserStore,
};
use crate::models::{
    ContactMessage, Ebook, NewContactMessage, NewTestimonial, NewUser, NewsletterSubscriber,
    SubscribeOutcome, Testimonial, User,
};

/// Monotonic id source starting at 1.
#[derive(Debug, Default)]
struct Sequence(i32);

impl Sequence {
    const fn next_id(&mut self) -> i32 {
        self.0 += 1;
        self.0
    }
}

#[derive(Debug)]
struct UserRecord {
    user: User,
    password_hash: String,
    wishlist: Wishlist,
}

#[derive(Debug, Default)]
struct Accounts {
    users: BTreeMap<UserId, UserRecord>,
    profiles: BTreeMap<UserId, AffiliateProfile>,
    referrals: Vec<Referral>,
    user_ids: Sequence,
    referral_ids: Sequence,
}

impl Accounts {
    fn email_taken(&self, email: &Email, except: Option<UserId>) -> bool {
        self.users
            .values()
            .any(|r| &r.user.email == email && Some(r.user.id) != except)
    }

    fn code_taken(&self, code: &str, except: UserId) -> bool {
        self.profiles
            .values()
            .any(|p| p.redeem_code == code && p.user_id != except)
    }

    /// A fresh profile under the first redeem code nobody else holds.
    fn new_profile(&self, user_id: UserId) -> Result<AffiliateProfile, RepositoryError> {
        redeem_code_candidates(user_id)
            .into_iter()
            .find(|code| !self.code_taken(code, user_id))
            .map(|code| AffiliateProfile::with_redeem_code(user_id, code))
            .ok_or_else(|| RepositoryError::Conflict(REDEEM_CODE_TAKEN.to_owned()))
    }
}

#[derive(Debug, Default)]
struct Orders {
    orders: Vec<Order>,
    order_ids: Sequence,
    item_ids: Sequence,
}

#[derive(Debug, Default)]
struct Engagement {
    testimonials: Vec<Testimonial>,
    ebooks: BTreeMap<EbookId, Ebook>,
    subscribers: Vec<NewsletterSubscriber>,
    contacts: Vec<ContactMessage>,
    testimonial_ids: Sequence,
    subscriber_ids: Sequence,
    contact_ids: Sequence,
}

/// Store that keeps everything in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    accounts: Mutex<Accounts>,
    products: Mutex<BTreeMap<ProductId, Product>>,
    discounts: Mutex<BTreeMap<DiscountId, DiscountCode>>,
    orders: Mutex<Orders>,
    engagement: Mutex<Engagement>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create_user(
        &self,
        new_user: NewUser,
    ) -> Result<(User, AffiliateProfile), RepositoryError> {
        let mut accounts = self.accounts.lock().await;

        if accounts.email_taken(&new_user.email, None) {
            return Err(RepositoryError::Conflict(DUPLICATE_EMAIL.to_owned()));
        }

        let id = UserId::new(accounts.user_ids.next_id());
        let profile = accounts.new_profile(id)?;

        let now = Utc::now();
        let user = User {
            id,
            name: new_user.name,
            email: new_user.email,
            referred_by: new_user.referred_by,
            created_at: now,
            updated_at: now,
        };

        accounts.users.insert(
            id,
            UserRecord {
                user: user.clone(),
                password_hash: new_user.password_hash,
                wishlist: Wishlist::default(),
            },
        );
        accounts.profiles.insert(id, profile.clone());

        Ok((user, profile))
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let accounts = self.accounts.lock().await;
        Ok(accounts.users.get(&id).map(|r| r.user.clone()))
    }

    async fn get_user_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        let accounts = self.accounts.lock().await;
        Ok(accounts
            .users
            .values()
            .find(|r| &r.user.email == email)
            .map(|r| r.user.clone()))
    }

    async fn get_credentials(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let accounts = self.accounts.lock().await;
        Ok(accounts
            .users
            .values()
            .find(|r| &r.user.email == email)
            .map(|r| (r.user.clone(), r.password_hash.clone())))
    }

    async fn get_password_hash(&self, id: UserId) -> Result<Option<String>, RepositoryError> {
        let accounts = self.accounts.lock().await;
        Ok(accounts.users.get(&id).map(|r| r.password_hash.clone()))
    }

    async fn update_profile(
        &self,
        id: UserId,
        name: &str,
        email: &Email,
    ) -> Result<User, RepositoryError> {
        let mut accounts = self.accounts.lock().await;

        if accounts.email_taken(email, Some(id)) {
            return Err(RepositoryError::Conflict("email already in use".to_owned()));
        }

        let record = accounts
            .users
            .get_mut(&id)
            .ok_or(RepositoryError::NotFound)?;
        record.user.name = name.to_owned();
        record.user.email = email.clone();
        record.user.updated_at = Utc::now();

        Ok(record.user.clone())
    }

    async fn update_password(
        &self,
        id: UserId,
        password_hash: &str,
    ) -> Result<(), RepositoryError> {
        let mut accounts = self.accounts.lock().await;
        let record = accounts
            .users
            .get_mut(&id)
            .ok_or(RepositoryError::NotFound)?;
        password_hash.clone_into(&mut record.password_hash);
        record.user.updated_at = Utc::now();
        Ok(())
    }

    async fn get_wishlist(&self, id: UserId) -> Result<Wishlist, RepositoryError> {
        let accounts = self.accounts.lock().await;
        accounts
            .users
            .get(&id)
            .map(|r| r.wishlist.clone())
            .ok_or(RepositoryError::NotFound)
    }

    async fn add_to_wishlist(
        &self,
        id: UserId,
        product_id: &ProductId,
    ) -> Result<Wishlist, RepositoryError> {
        let mut accounts = self.accounts.lock().await;
        let record = accounts
            .users
            .get_mut(&id)
            .ok_or(RepositoryError::NotFound)?;

        record
            .wishlist
            .add(product_id.clone())
            .map_err(|e: WishlistError| RepositoryError::Conflict(e.to_string()))?;

        Ok(record.wishlist.clone())
    }

    async fn remove_from_wishlist(
        &self,
        id: UserId,
        product_id: &ProductId,
    ) -> Result<Wishlist, RepositoryError> {
        let mut accounts = self.accounts.lock().await;
        let record = accounts
            .users
            .get_mut(&id)
            .ok_or(RepositoryError::NotFound)?;

        record
            .wishlist
            .remove(product_id)
            .map_err(|_| RepositoryError::NotFound)?;

        Ok(record.wishlist.clone())
    }
}

#[async_trait]
impl AffiliateStore for MemoryStore {
    async fn get_affiliate(
        &self,
        user_id: UserId,
    ) -> Result<Option<AffiliateProfile>, RepositoryError> {
        let accounts = self.accounts.lock().await;
        Ok(accounts.profiles.get(&user_id).cloned())
    }

    async fn ensure_affiliate(&self, user_id: UserId) -> Result<AffiliateProfile, RepositoryError> {
        let mut accounts = self.accounts.lock().await;

        if let Some(profile) = accounts.profiles.get(&user_id) {
            return Ok(profile.clone());
        }
        if !accounts.users.contains_key(&user_id) {
            return Err(RepositoryError::NotFound);
        }

        let profile = accounts.new_profile(user_id)?;
        accounts.profiles.insert(user_id, profile.clone());
        Ok(profile)
    }

    async fn find_affiliate_by_code(
        &self,
        code: &str,
    ) -> Result<Option<AffiliateProfile>, RepositoryError> {
        let accounts = self.accounts.lock().await;
        Ok(accounts
            .profiles
            .values()
            .find(|p| p.redeem_code == code)
            .cloned())
    }

    async fn credit_referral(
        &self,
        code: &str,
        amount: Decimal,
        referred_user: Option<UserId>,
        at: DateTime<Utc>,
    ) -> Result<CreditedReferral, RepositoryError> {
        let mut accounts = self.accounts.lock().await;

        let referral_id = ReferralId::new(accounts.referral_ids.next_id());
        let profile = accounts
            .profiles
            .values_mut()
            .find(|p| p.redeem_code == code)
            .ok_or(RepositoryError::NotFound)?;

        let credit = profile
            .credit(amount)
            .map_err(|e| RepositoryError::Conflict(e.to_string()))?;
        let profile = profile.clone();

        let referral = Referral {
            id: referral_id,
            affiliate_id: profile.user_id,
            referred_user_id: referred_user,
            amount,
            commission: credit.commission,
            status: ReferralStatus::Pending,
            created_at: at,
        };
        accounts.referrals.push(referral.clone());

        Ok(CreditedReferral {
            profile,
            referral,
            credit,
        })
    }

    async fn list_referrals(&self, user_id: UserId) -> Result<Vec<Referral>, RepositoryError> {
        let accounts = self.accounts.lock().await;
        let mut referrals: Vec<Referral> = accounts
            .referrals
            .iter()
            .filter(|r| r.affiliate_id == user_id)
            .cloned()
            .collect();
        referrals.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(referrals)
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn list_products(&self, query: &ProductQuery) -> Result<Vec<Product>, RepositoryError> {
        let products = self.products.lock().await;
        Ok(query.apply(products.values()))
    }

    async fn get_product(&self, id: &ProductId) -> Result<Option<Product>, RepositoryError> {
        let products = self.products.lock().await;
        Ok(products.get(id).cloned())
    }

    async fn get_products(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError> {
        let products = self.products.lock().await;
        Ok(ids.iter().filter_map(|id| products.get(id).cloned()).collect())
    }

    async fn upsert_product(&self, product: &Product) -> Result<(), RepositoryError> {
        let mut products = self.products.lock().await;
        match products.get_mut(&product.id) {
            Some(existing) => {
                let created_at = existing.created_at;
                *existing = product.clone();
                existing.created_at = created_at;
            }
            None => {
                products.insert(product.id.clone(), product.clone());
            }
        }
        Ok(())
    }
}

#[async_trait]
impl DiscountStore for MemoryStore {
    async fn find_discount(&self, code: &str) -> Result<Option<DiscountCode>, RepositoryError> {
        let discounts = self.discounts.lock().await;
        Ok(discounts
            .values()
            .find(|d| d.active && d.matches_code(code))
            .cloned())
    }

    async fn record_discount_use(
        &self,
        id: &DiscountId,
        now: DateTime<Utc>,
    ) -> Result<Option<DiscountCode>, RepositoryError> {
        let mut discounts = self.discounts.lock().await;
        let Some(discount) = discounts.get_mut(id) else {
            return Ok(None);
        };
        if discount.ensure_usable(now).is_err() {
            return Ok(None);
        }
        discount.used_count += 1;
        Ok(Some(discount.clone()))
    }

    async fn insert_discount(&self, discount: &DiscountCode) -> Result<(), RepositoryError> {
        let mut discounts = self.discounts.lock().await;
        let duplicate = discounts.contains_key(&discount.id)
            || discounts.values().any(|d| d.matches_code(&discount.code));
        if duplicate {
            return Err(RepositoryError::Conflict(
                "discount code already exists".to_owned(),
            ));
        }
        discounts.insert(discount.id.clone(), discount.clone());
        Ok(())
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn create_order(&self, order: NewOrder) -> Result<Order, RepositoryError> {
        let mut orders = self.orders.lock().await;

        let id = OrderId::new(orders.order_ids.next_id());
        let items = order
            .lines
            .into_iter()
            .map(|line| OrderItem {
                id: OrderItemId::new(orders.item_ids.next_id()),
                product_id: line.product_id,
                product_name: line.product_name,
                quantity: line.quantity,
                price: line.unit_price,
            })
            .collect();

        let stored = Order {
            id,
            user_id: order.user_id,
            status: OrderStatus::Pending,
            customer: order.customer,
            items,
            subtotal: order.totals.subtotal,
            discount_code: order.discount_code,
            discount_amount: order.totals.discount_amount,
            total: order.totals.total,
            affiliate_code: order.affiliate_code,
            created_at: Utc::now(),
        };
        orders.orders.push(stored.clone());

        Ok(stored)
    }

    async fn list_orders(
        &self,
        user_id: UserId,
        limit: i64,
    ) -> Result<Vec<Order>, RepositoryError> {
        let orders = self.orders.lock().await;
        let limit = usize::try_from(limit).unwrap_or(0);
        Ok(orders
            .orders
            .iter()
            .rev()
            .filter(|o| o.user_id == user_id)
            .take(limit)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl TestimonialStore for MemoryStore {
    async fn list_testimonials(&self) -> Result<Vec<Testimonial>, RepositoryError> {
        let engagement = self.engagement.lock().await;
        let mut testimonials = engagement.testimonials.clone();
        testimonials.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(testimonials)
    }

    async fn create_testimonial(
        &self,
        testimonial: NewTestimonial,
    ) -> Result<Testimonial, RepositoryError> {
        let mut engagement = self.engagement.lock().await;
        let stored = Testimonial {
            id: TestimonialId::new(engagement.testimonial_ids.next_id()),
            user_id: testimonial.user_id,
            name: testimonial.name,
            location: testimonial.location,
            rating: testimonial.rating,
            text: testimonial.text,
            product: testimonial.product,
            verified: testimonial.verified,
            created_at: Utc::now(),
        };
        engagement.testimonials.push(stored.clone());
        Ok(stored)
    }

    async fn count_testimonials(&self) -> Result<i64, RepositoryError> {
        let engagement = self.engagement.lock().await;
        i64::try_from(engagement.testimonials.len())
            .map_err(|e| RepositoryError::DataCorruption(e.to_string()))
    }
}

#[async_trait]
impl EbookStore for MemoryStore {
    async fn list_ebooks(
        &self,
        category: Option<&str>,
        featured: Option<bool>,
    ) -> Result<Vec<Ebook>, RepositoryError> {
        let engagement = self.engagement.lock().await;
        let mut ebooks: Vec<Ebook> = engagement
            .ebooks
            .values()
            .filter(|e| e.matches(category, featured))
            .cloned()
            .collect();
        ebooks.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(ebooks)
    }

    async fn get_ebook(&self, id: &EbookId) -> Result<Option<Ebook>, RepositoryError> {
        let engagement = self.engagement.lock().await;
        Ok(engagement.ebooks.get(id).cloned())
    }

    async fn record_download(&self, id: &EbookId) -> Result<Option<Ebook>, RepositoryError> {
        let mut engagement = self.engagement.lock().await;
        Ok(engagement.ebooks.get_mut(id).map(|ebook| {
            ebook.downloads += 1;
            ebook.clone()
        }))
    }

    async fn upsert_ebook(&self, ebook: &Ebook) -> Result<(), RepositoryError> {
        let mut engagement = self.engagement.lock().await;
        match engagement.ebooks.get_mut(&ebook.id) {
            Some(existing) => {
                let downloads = existing.downloads;
                let created_at = existing.created_at;
                *existing = ebook.clone();
                existing.downloads = downloads;
                existing.created_at = created_at;
            }
            None => {
                engagement.ebooks.insert(ebook.id.clone(), ebook.clone());
            }
        }
        Ok(())
    }
}

#[async_trait]
impl NewsletterStore for MemoryStore {
    async fn subscribe(
        &self,
        email: &Email,
        name: Option<&str>,
    ) -> Result<SubscribeOutcome, RepositoryError> {
        let mut engagement = self.engagement.lock().await;

        if let Some(existing) = engagement.subscribers.iter_mut().find(|s| &s.email == email) {
            if existing.active {
                return Ok(SubscribeOutcome::AlreadyActive);
            }
            existing.active = true;
            existing.unsubscribed_at = None;
            existing.subscribed_at = Utc::now();
            if let Some(name) = name {
                existing.name = Some(name.to_owned());
            }
            return Ok(SubscribeOutcome::Reactivated(existing.clone()));
        }

        let subscriber = NewsletterSubscriber {
            id: SubscriberId::new(engagement.subscriber_ids.next_id()),
            email: email.clone(),
            name: name.map(str::to_owned),
            active: true,
            subscribed_at: Utc::now(),
            unsubscribed_at: None,
        };
        engagement.subscribers.push(subscriber.clone());
        Ok(SubscribeOutcome::Created(subscriber))
    }

    async fn unsubscribe(&self, email: &Email) -> Result<bool, RepositoryError> {
        let mut engagement = self.engagement.lock().await;
        let Some(existing) = engagement
            .subscribers
            .iter_mut()
            .find(|s| &s.email == email && s.active)
        else {
            return Ok(false);
        };
        existing.active = false;
        existing.unsubscribed_at = Some(Utc::now());
        Ok(true)
    }
}

#[async_trait]
impl ContactStore for MemoryStore {
    async fn create_contact_message(
        &self,
        message: NewContactMessage,
    ) -> Result<ContactMessage, RepositoryError> {
        let mut engagement = self.engagement.lock().await;
        let stored = ContactMessage {
            id: ContactMessageId::new(engagement.contact_ids.next_id()),
            name: message.name,
            email: message.email,
            subject: message.subject,
            message: message.message,
            created_at: Utc::now(),
        };
        engagement.contacts.push(stored.clone());
        Ok(stored)
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use joestar_core::{AffiliateTier, DiscountKind};

    use super::*;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            name: "Jotaro".to_owned(),
            email: Email::parse(email).unwrap(),
            password_hash: "hash".to_owned(),
            referred_by: None,
        }
    }

    fn discount(code: &str, max_uses: i32) -> DiscountCode {
        DiscountCode {
            id: DiscountId::new(code.to_lowercase()),
            code: code.to_owned(),
            discount: Decimal::from(10),
            kind: DiscountKind::Percentage,
            max_uses,
            used_count: 0,
            valid_until: None,
            active: true,
            description: None,
        }
    }

    #[tokio::test]
    async fn test_create_user_creates_affiliate_profile() {
        let store = MemoryStore::new();
        let (user, profile) = store.create_user(new_user("a@example.com")).await.unwrap();

        assert_eq!(user.id, UserId::new(1));
        assert_eq!(profile.redeem_code, "JOESTAR0001");
        assert_eq!(
            store.get_affiliate(user.id).await.unwrap(),
            Some(profile)
        );
    }

    #[tokio::test]
    async fn test_redeem_code_falls_back_past_ten_thousand_users() {
        let store = MemoryStore::new();
        for n in 1..=10_000 {
            store
                .create_user(new_user(&format!("user{n}@example.com")))
                .await
                .unwrap();
        }

        let (user, profile) = store
            .create_user(new_user("late@example.com"))
            .await
            .unwrap();
        assert_eq!(user.id, UserId::new(10_001));
        assert_eq!(profile.redeem_code, "JOESTAR10001");

        let first = store.find_affiliate_by_code("JOESTAR0001").await.unwrap();
        assert_eq!(first.map(|p| p.user_id), Some(UserId::new(1)));
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let store = MemoryStore::new();
        store.create_user(new_user("a@example.com")).await.unwrap();
        let err = store.create_user(new_user("a@example.com")).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_update_profile_rejects_taken_email() {
        let store = MemoryStore::new();
        let (a, _) = store.create_user(new_user("a@example.com")).await.unwrap();
        store.create_user(new_user("b@example.com")).await.unwrap();

        let taken = Email::parse("b@example.com").unwrap();
        let err = store.update_profile(a.id, "A", &taken).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));

        // Keeping your own email is fine
        let own = Email::parse("a@example.com").unwrap();
        let updated = store.update_profile(a.id, "A", &own).await.unwrap();
        assert_eq!(updated.name, "A");
    }

    #[tokio::test]
    async fn test_discount_use_stops_at_limit() {
        let store = MemoryStore::new();
        let code = discount("ONCE", 1);
        store.insert_discount(&code).await.unwrap();

        let now = Utc::now();
        let first = store.record_discount_use(&code.id, now).await.unwrap().unwrap();
        assert_eq!(first.used_count, 1);
        assert!(store.record_discount_use(&code.id, now).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_discount_use_rejects_expired_code() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let mut code = discount("LASTCALL", 5);
        code.valid_until = Some(now);
        store.insert_discount(&code).await.unwrap();

        let later = now + chrono::Duration::seconds(1);
        assert!(store.record_discount_use(&code.id, later).await.unwrap().is_none());

        let used = store.record_discount_use(&code.id, now).await.unwrap().unwrap();
        assert_eq!(used.used_count, 1);
    }

    #[tokio::test]
    async fn test_discount_lookup_ignores_case_and_duplicates_conflict() {
        let store = MemoryStore::new();
        store.insert_discount(&discount("WELCOME10", 5)).await.unwrap();

        assert!(store.find_discount(" welcome10 ").await.unwrap().is_some());

        let mut clash = discount("welcome10", 5);
        clash.id = DiscountId::new("other");
        let err = store.insert_discount(&clash).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_credit_referral_updates_profile_and_history() {
        let store = MemoryStore::new();
        let (user, profile) = store.create_user(new_user("a@example.com")).await.unwrap();

        let credited = store
            .credit_referral(
                &profile.redeem_code,
                Decimal::from(2_500_000),
                None,
                Utc::now(),
            )
            .await
            .unwrap();

        assert_eq!(credited.credit.commission, Decimal::from(100_000));
        assert_eq!(credited.profile.tier, AffiliateTier::Silver);
        assert!(credited.credit.upgraded());

        let referrals = store.list_referrals(user.id).await.unwrap();
        assert_eq!(referrals.len(), 1);
        assert_eq!(referrals[0].status, ReferralStatus::Pending);
    }

    #[tokio::test]
    async fn test_credit_referral_unknown_code() {
        let store = MemoryStore::new();
        let err = store
            .credit_referral("JOESTAR9999", Decimal::ONE, None, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound));
    }

    #[tokio::test]
    async fn test_wishlist_add_and_remove() {
        let store = MemoryStore::new();
        let (user, _) = store.create_user(new_user("a@example.com")).await.unwrap();
        let bpc = ProductId::new("bpc-157");

        let list = store.add_to_wishlist(user.id, &bpc).await.unwrap();
        assert!(list.contains(&bpc));

        let err = store.add_to_wishlist(user.id, &bpc).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));

        let list = store.remove_from_wishlist(user.id, &bpc).await.unwrap();
        assert!(list.is_empty());

        let err = store.remove_from_wishlist(user.id, &bpc).await.unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound));
    }

    #[tokio::test]
    async fn test_newsletter_lifecycle() {
        let store = MemoryStore::new();
        let email = Email::parse("reader@example.com").unwrap();

        assert!(matches!(
            store.subscribe(&email, Some("Reader")).await.unwrap(),
            SubscribeOutcome::Created(_)
        ));
        assert_eq!(
            store.subscribe(&email, None).await.unwrap(),
            SubscribeOutcome::AlreadyActive
        );
        assert!(store.unsubscribe(&email).await.unwrap());
        assert!(!store.unsubscribe(&email).await.unwrap());

        let SubscribeOutcome::Reactivated(sub) = store.subscribe(&email, None).await.unwrap()
        else {
            panic!("expected reactivation");
        };
        assert!(sub.active);
        assert_eq!(sub.name.as_deref(), Some("Reader"));
    }

    #[tokio::test]
    async fn test_orders_listed_newest_first_with_limit() {
        use joestar_core::order::{CustomerInfo, OrderLine, OrderTotals};

        let store = MemoryStore::new();
        let user_id = UserId::new(1);
        for qty in 1..=3 {
            let lines = vec![OrderLine {
                product_id: ProductId::new("bpc-157"),
                product_name: "BPC-157".to_owned(),
                quantity: qty,
                unit_price: Decimal::from(100),
            }];
            let totals = OrderTotals::compute(&lines, Decimal::ZERO);
            store
                .create_order(NewOrder {
                    user_id,
                    customer: CustomerInfo {
                        name: "Jotaro".to_owned(),
                        email: Email::parse("a@example.com").unwrap(),
                        phone: None,
                        address: None,
                    },
                    lines,
                    discount_code: None,
                    affiliate_code: None,
                    totals,
                })
                .await
                .unwrap();
        }

        let orders = store.list_orders(user_id, 2).await.unwrap();
        assert_eq!(orders.len(), 2);
        assert_eq!(orders[0].id, OrderId::new(3));
        assert!(orders.iter().all(Order::is_consistent));
    }

    #[tokio::test]
    async fn test_ebook_upsert_keeps_downloads() {
        let store = MemoryStore::new();
        let ebook: Ebook = serde_json::from_str(
            r#"{"id":"peptide-basics","title":"Peptide Basics"}"#,
        )
        .unwrap();
        store.upsert_ebook(&ebook).await.unwrap();
        store.record_download(&ebook.id).await.unwrap();

        let mut renamed = ebook.clone();
        renamed.title = "Peptide Basics, 2nd ed.".to_owned();
        store.upsert_ebook(&renamed).await.unwrap();

        let stored = store.get_ebook(&ebook.id).await.unwrap().unwrap();
        assert_eq!(stored.downloads, 1);
        assert_eq!(stored.title, "Peptide Basics, 2nd ed.");
    }
}
